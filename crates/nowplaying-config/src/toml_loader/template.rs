//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# nowplaying configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[presence]
# user_id = "688967048541503506"   # Discord user to watch (or pass --user-id)
# relay_url = "wss://api.lanyard.rest/socket"
# max_reconnect_attempts = 5       # 1-20
# reconnect_base_delay_ms = 1000   # 100-60000, doubles per attempt
# max_reconnect_delay_ms = 30000   # base-600000
# connect_timeout_secs = 15        # 1-120

[logging]
# level = "INFO"                   # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
