use onair_core::domain::runner::TakeoverMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub runner: FileRunnerConfig,
    #[serde(default)]
    pub license: FileLicenseConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

/// Durations are humantime strings such as `"30s"` or `"1h 30m"`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRunnerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standby_poll_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub takeover: Option<TakeoverMode>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLicenseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_tolerance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascade_attempts: Option<u32>,
}

/// Values read from the process environment. Unparseable numbers are
/// treated as unset; durations and the takeover mode are kept raw and
/// validated by the loader.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub server_cors_allowed_origins: Option<Vec<String>>,
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub runner_id: Option<String>,
    pub runner_heartbeat_interval: Option<String>,
    pub runner_standby_poll_interval: Option<String>,
    pub runner_takeover: Option<String>,
    pub license_secret_key: Option<String>,
    pub license_lease: Option<String>,
    pub license_check_in_window: Option<String>,
    pub license_grace_tolerance: Option<String>,
    pub license_cascade_attempts: Option<u32>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name).filter(|value| !value.trim().is_empty())
        };

        Self {
            config_path: var("ONAIR_CONFIG_PATH").map(PathBuf::from),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT").and_then(|s| s.parse().ok()),
            server_cors_allowed_origins: var("SERVER_CORS_ALLOWED_ORIGINS").map(
                |raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                },
            ),
            database_url: var("DATABASE_URL"),
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok()),
            runner_id: var("RUNNER_ID"),
            runner_heartbeat_interval: var("RUNNER_HEARTBEAT_INTERVAL"),
            runner_standby_poll_interval: var("RUNNER_STANDBY_POLL_INTERVAL"),
            runner_takeover: var("RUNNER_TAKEOVER"),
            license_secret_key: var("LICENSE_SECRET_KEY"),
            license_lease: var("LICENSE_LEASE"),
            license_check_in_window: var("LICENSE_CHECK_IN_WINDOW"),
            license_grace_tolerance: var("LICENSE_GRACE_TOLERANCE"),
            license_cascade_attempts: var("LICENSE_CASCADE_ATTEMPTS")
                .and_then(|s| s.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn blank_and_malformed_values_are_unset() {
        let vars = HashMap::from([
            ("SERVER_PORT", "not-a-port"),
            ("DATABASE_URL", "   "),
            ("RUNNER_ID", "runner-a"),
        ]);
        let env = EnvConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(env.server_port, None);
        assert_eq!(env.database_url, None);
        assert_eq!(env.runner_id.as_deref(), Some("runner-a"));
    }

    #[test]
    fn file_config_accepts_partial_sections() {
        let file: FileConfig = toml::from_str(
            r#"
            [runner]
            takeover = "legacy"
            heartbeat_interval = "10s"
            "#,
        )
        .unwrap();

        assert_eq!(file.runner.takeover, Some(TakeoverMode::Legacy));
        assert_eq!(file.runner.heartbeat_interval.as_deref(), Some("10s"));
        assert!(file.server.host.is_none());
    }
}
