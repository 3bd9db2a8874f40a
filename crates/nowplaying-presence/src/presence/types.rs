//! Configuration and status types for the presence client.

use std::fmt;
use std::time::Duration;

use super::policy::ReconnectPolicy;

/// Public Lanyard socket endpoint.
pub const DEFAULT_RELAY_URL: &str = "wss://api.lanyard.rest/socket";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the presence client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceConfig {
    /// WebSocket URL of the presence relay.
    pub relay_url: String,
    /// Reconnects scheduled after unplanned closures before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect; doubles per attempt.
    pub reconnect_base_delay: Duration,
    /// Upper bound on any reconnect delay.
    pub max_reconnect_delay: Duration,
    /// How long a single connect attempt may take.
    pub connect_timeout: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            max_reconnect_attempts: ReconnectPolicy::DEFAULT_MAX_ATTEMPTS,
            reconnect_base_delay: ReconnectPolicy::DEFAULT_BASE_DELAY,
            max_reconnect_delay: ReconnectPolicy::DEFAULT_MAX_DELAY,
            connect_timeout: Duration::from_secs(15),
        }
    }
}

impl PresenceConfig {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            self.max_reconnect_attempts,
            self.reconnect_base_delay,
            self.max_reconnect_delay,
        )
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// User-facing connection status, surfaced alongside state changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
    /// Reconnect budget exhausted. Only an explicit `start()` recovers.
    Failed,
}

impl ConnectionStatus {
    pub fn message(&self) -> String {
        match self {
            Self::Disconnected => "Disconnected".to_string(),
            Self::Connecting => "Connecting...".to_string(),
            Self::Connected => "Connected!".to_string(),
            Self::Reconnecting {
                attempt,
                max_attempts,
                ..
            } => format!("Reconnecting... ({attempt}/{max_attempts})"),
            Self::Failed => "Connection failed".to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
