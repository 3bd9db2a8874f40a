//! Presence relay connection settings.

use serde::{Deserialize, Serialize};

/// `[presence]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Discord user to watch. Can also be given on the command line.
    pub user_id: Option<String>,
    pub relay_url: String,
    /// Valid range: 1-20.
    pub max_reconnect_attempts: u32,
    /// Valid range: 100-60000.
    pub reconnect_base_delay_ms: u32,
    /// Must be at least `reconnect_base_delay_ms`, at most 600000.
    pub max_reconnect_delay_ms: u32,
    /// Valid range: 1-120.
    pub connect_timeout_secs: u32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            relay_url: "wss://api.lanyard.rest/socket".into(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            max_reconnect_delay_ms: 30_000,
            connect_timeout_secs: 15,
        }
    }
}
