use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const TOKEN_ENV_VAR: &str = "SPLITCHAT_TOKEN";

/// Offsets beyond a day are rejected by chrono.
const MAX_OFFSET_MINUTES: i32 = 23 * 60 + 59;

pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if config_path.exists() {
        let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
            path: config_path.clone(),
            source,
        })?;

        let file_config: FileConfig =
            toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
                path: config_path,
                source,
            })?;

        file_config.merge_into(&mut config);
    }

    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(token) = env::var(TOKEN_ENV_VAR)
        .ok()
        .filter(|token| !token.trim().is_empty())
    {
        config.server.token = Some(token);
    }
}

fn validate(config: &AppConfig) -> Result<(), AppError> {
    let intervals = [
        ("sync.poll_interval_ms", config.sync.poll_interval_ms),
        ("sync.reconnect_delay_ms", config.sync.reconnect_delay_ms),
        ("sync.typing_ttl_ms", config.sync.typing_ttl_ms),
        ("sync.typing_throttle_ms", config.sync.typing_throttle_ms),
        ("sync.refresh_interval_ms", config.sync.refresh_interval_ms),
    ];

    if let Some((field, _)) = intervals.iter().find(|(_, value)| *value == 0) {
        return Err(AppError::InvalidConfig {
            field: *field,
            reason: "interval must be greater than zero".to_owned(),
        });
    }

    if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&config.display.utc_offset_minutes) {
        return Err(AppError::InvalidConfig {
            field: "display.utc_offset_minutes",
            reason: format!("must be within +/-{MAX_OFFSET_MINUTES} minutes"),
        });
    }

    let base_url = config.server.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(AppError::InvalidConfig {
            field: "server.base_url",
            reason: "must start with http:// or https://".to_owned(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{infra::config::ReconnectMode, test_support::env_lock};

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, body).expect("must write test config");
        path
    }

    #[test]
    fn returns_defaults_when_file_is_missing() {
        let _guard = env_lock();
        env::remove_var(TOKEN_ENV_VAR);

        let config = load(Some(Path::new("./missing-config.toml"))).expect("config must load");

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn merges_file_values_over_defaults() {
        let _guard = env_lock();
        env::remove_var(TOKEN_ENV_VAR);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            &dir,
            r#"[logging]
level = "debug"

[server]
base_url = "https://split.example"
token = "file-token"

[sync]
poll_interval_ms = 5000
reconnect = "once"

[display]
utc_offset_minutes = 60
"#,
        );

        let config = load(Some(&path)).expect("config must load");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.server.base_url, "https://split.example");
        assert_eq!(config.server.token.as_deref(), Some("file-token"));
        assert_eq!(config.sync.poll_interval_ms, 5_000);
        assert_eq!(config.sync.reconnect, ReconnectMode::Once);
        assert_eq!(config.sync.reconnect_delay_ms, 3_000);
        assert_eq!(config.display.utc_offset_minutes, 60);
    }

    #[test]
    fn env_token_overrides_file_token() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, "[server]\ntoken = \"file-token\"\n");
        env::set_var(TOKEN_ENV_VAR, "env-token");

        let config = load(Some(&path));
        env::remove_var(TOKEN_ENV_VAR);

        assert_eq!(
            config.expect("config must load").server.token.as_deref(),
            Some("env-token")
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, "[sync]\npoll_interval_ms = 0\n");

        let error = load(Some(&path)).expect_err("zero interval must fail");

        assert!(matches!(
            error,
            AppError::InvalidConfig {
                field: "sync.poll_interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn unknown_reconnect_mode_is_a_parse_error() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, "[sync]\nreconnect = \"sometimes\"\n");

        let error = load(Some(&path)).expect_err("bad mode must fail");

        assert!(matches!(error, AppError::ConfigParse { .. }));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, "[display]\nutc_offset_minutes = 1440\n");

        let error = load(Some(&path)).expect_err("offset must fail");

        assert!(matches!(error, AppError::InvalidConfig { .. }));
    }
}
