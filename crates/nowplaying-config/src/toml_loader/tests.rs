//! Tests for TOML config loading, creation, and path resolution.

use super::template::default_config_toml;
use super::*;
use crate::schema::{LogLevel, NowPlayingConfig};
use nowplaying_common::ConfigError;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_nowplaying_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[presence]
user_id = "688967048541503506"
max_reconnect_attempts = 8
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(
        config.presence.user_id.as_deref(),
        Some("688967048541503506")
    );
    assert_eq!(config.presence.max_reconnect_attempts, 8);
    // Defaults preserved
    assert_eq!(config.presence.relay_url, "wss://api.lanyard.rest/socket");
    assert_eq!(config.presence.reconnect_base_delay_ms, 1000);
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn load_logging_level() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"DEBUG\"\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.level.as_directive(), "debug");
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_wrongly_typed_value_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[presence]\nmax_reconnect_attempts = \"many\"\n").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_config_with_invalid_values_returns_parsed_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[presence]
connect_timeout_secs = 0
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.presence.connect_timeout_secs, 0);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nowplaying").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config, NowPlayingConfig::default());
}

#[test]
fn default_config_toml_is_valid() {
    let config: NowPlayingConfig = toml::from_str(&default_config_toml()).unwrap();
    assert_eq!(config, NowPlayingConfig::default());
}

#[test]
fn default_config_path_is_reasonable() {
    // Not every CI environment has a config dir.
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("nowplaying"));
        assert!(path_str.ends_with("config.toml"));
    }
}
