use std::{path::PathBuf, time::Duration};

use onair_core::domain::{
    license::LicensePolicy,
    runner::{RunnerSettings, TakeoverMode},
};

use super::loader::ConfigLoadError;

/// Fully resolved configuration, composed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub runner: RunnerConfig,
    pub license: LicenseConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API. `*` allows any origin;
    /// empty disables CORS headers entirely.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub runner_id: String,
    pub heartbeat_interval: Duration,
    pub standby_poll_interval: Duration,
    pub takeover: TakeoverMode,
}

impl RunnerConfig {
    pub fn settings(&self) -> RunnerSettings {
        RunnerSettings {
            runner_id: self.runner_id.clone(),
            heartbeat_interval: self.heartbeat_interval,
            standby_poll_interval: self.standby_poll_interval,
            takeover: self.takeover,
        }
    }
}

#[derive(Clone)]
pub struct LicenseConfig {
    /// HMAC key for member secrets. Required by the HTTP surface only.
    pub secret_key: Option<String>,
    pub policy: LicensePolicy,
}

impl LicenseConfig {
    pub fn require_secret_key(&self) -> Result<&str, ConfigLoadError> {
        self.secret_key
            .as_deref()
            .ok_or(ConfigLoadError::MissingSecretKey)
    }
}

impl std::fmt::Debug for LicenseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("policy", &self.policy)
            .finish()
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
