//! `[presence]` validation.

use crate::schema::NowPlayingConfig;

use super::helpers::{validate_range, validate_scheme};

pub(crate) fn validate_presence(errors: &mut Vec<String>, config: &NowPlayingConfig) {
    let presence = &config.presence;

    if let Some(user_id) = &presence.user_id {
        if user_id.is_empty() || !user_id.bytes().all(|b| b.is_ascii_digit()) {
            errors.push(format!(
                "presence.user_id = {user_id:?} is not a numeric Discord id"
            ));
        }
    }

    validate_scheme(errors, "presence.relay_url", &presence.relay_url, &["ws://", "wss://"]);

    validate_range(
        errors,
        "presence.max_reconnect_attempts",
        presence.max_reconnect_attempts,
        1,
        20,
    );
    validate_range(
        errors,
        "presence.reconnect_base_delay_ms",
        presence.reconnect_base_delay_ms,
        100,
        60_000,
    );
    // The cap may not undercut the first delay.
    validate_range(
        errors,
        "presence.max_reconnect_delay_ms",
        presence.max_reconnect_delay_ms,
        presence.reconnect_base_delay_ms,
        600_000,
    );
    validate_range(
        errors,
        "presence.connect_timeout_secs",
        presence.connect_timeout_secs,
        1,
        120,
    );
}
