pub mod errors;
pub mod id;

pub use errors::{ConfigError, NowPlayingError, PresenceError};
pub use id::{new_connection_id, ConnectionId};
