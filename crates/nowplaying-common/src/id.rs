use serde::{Deserialize, Serialize};
use std::fmt;

/// Short hex id used to correlate log lines of one connection attempt.
pub fn new_connection_id() -> ConnectionId {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    ConnectionId(format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
