//! Configuration schema types for nowplaying.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod presence;
mod system;

pub use presence::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NowPlayingConfig {
    pub presence: PresenceConfig,
    pub logging: LoggingConfig,
}
