use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures inside the presence client.
///
/// None of these escape the client's public API: they are logged and turned
/// into state transitions by the driver.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0}s")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("invalid presence payload: {0}")]
    Payload(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NowPlayingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Other(String),
}
