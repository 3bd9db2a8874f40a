//! Merge config file values with command-line overrides into the settings
//! the watcher runs with.

use std::time::Duration;

use nowplaying_common::NowPlayingError;
use nowplaying_config::{validation, NowPlayingConfig};
use nowplaying_presence::PresenceConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub user_id: String,
    pub presence: PresenceConfig,
}

/// Apply overrides, validate the merged config, and build client settings.
pub fn resolve(
    mut config: NowPlayingConfig,
    user_id: Option<String>,
    relay_url: Option<String>,
) -> Result<WatchSettings, NowPlayingError> {
    if let Some(user_id) = user_id {
        config.presence.user_id = Some(user_id);
    }
    if let Some(url) = relay_url {
        config.presence.relay_url = url;
    }

    validation::validate(&config)?;

    let section = config.presence;
    let user_id = section.user_id.ok_or_else(|| {
        NowPlayingError::Other(
            "no Discord user id: pass --user-id or set presence.user_id".to_string(),
        )
    })?;

    Ok(WatchSettings {
        user_id,
        presence: PresenceConfig {
            relay_url: section.relay_url,
            max_reconnect_attempts: section.max_reconnect_attempts,
            reconnect_base_delay: Duration::from_millis(u64::from(section.reconnect_base_delay_ms)),
            max_reconnect_delay: Duration::from_millis(u64::from(section.max_reconnect_delay_ms)),
            connect_timeout: Duration::from_secs(u64::from(section.connect_timeout_secs)),
        },
    })
}
