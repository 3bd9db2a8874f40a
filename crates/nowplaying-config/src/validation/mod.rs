//! Configuration validation.
//!
//! Each section has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod presence;


use crate::schema::NowPlayingConfig;
use nowplaying_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &NowPlayingConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    presence::validate_presence(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
