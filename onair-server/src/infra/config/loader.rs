use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use onair_core::domain::{
    license::LicensePolicy,
    runner::{
        TakeoverMode,
        config::{DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_STANDBY_POLL_INTERVAL},
    },
};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use super::{
    models::{
        Config, ConfigMetadata, DatabaseConfig, LicenseConfig, RunnerConfig,
        ServerConfig,
    },
    sources::{
        EnvConfig, FileConfig, FileDatabaseConfig, FileLicenseConfig,
        FileRunnerConfig,
    },
};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["onair.toml", "config/onair.toml"];
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, then compose the file and process environment.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        self.compose(EnvConfig::gather(), env_file_loaded)
    }

    /// Compose against an explicit environment. Skips `.env` handling.
    pub fn load_from_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        self.compose(env, false)
    }

    fn compose(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No onair.toml detected; using environment variables and defaults",
                "Set ONAIR_CONFIG_PATH or place onair.toml in the working directory",
            );
        }

        let FileConfig {
            server: file_server,
            database: file_database,
            runner: file_runner,
            license: file_license,
        } = file_config.unwrap_or_default();

        let server = ServerConfig {
            host: env
                .server_host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
            cors_allowed_origins: resolve_cors_origins(
                env.server_cors_allowed_origins
                    .clone()
                    .or(file_server.cors_allowed_origins)
                    .unwrap_or_default(),
            )?,
        };

        let database = DatabaseConfig {
            url: resolve_database_url(&env, &file_database)?,
            max_connections: env
                .database_max_connections
                .or(file_database.max_connections)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS)
                .max(1),
        };

        let runner = resolve_runner(&env, file_runner, &mut warnings)?;
        let license = resolve_license(&env, file_license)?;

        let config = Config {
            server,
            database,
            runner,
            license,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env_config.config_path {
            source.env = Some(from_env.clone());
        }

        if source.is_empty() {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists());
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_database_url(
    env: &EnvConfig,
    file_database: &FileDatabaseConfig,
) -> Result<Option<String>, ConfigLoadError> {
    let Some(raw) = env.database_url.clone().or_else(|| {
        file_database
            .url
            .clone()
            .filter(|value| !value.trim().is_empty())
    }) else {
        return Ok(None);
    };

    let parsed = Url::parse(raw.trim())
        .map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
    Ok(Some(parsed.to_string()))
}

fn resolve_cors_origins(
    origins: Vec<String>,
) -> Result<Vec<String>, ConfigLoadError> {
    origins
        .into_iter()
        .map(|raw| {
            let value = raw.trim();
            if value == "*" {
                return Ok(value.to_string());
            }
            match Url::parse(value) {
                Ok(url)
                    if matches!(url.scheme(), "http" | "https")
                        && url.host().is_some() =>
                {
                    Ok(url.origin().ascii_serialization())
                }
                _ => Err(ConfigLoadError::InvalidCorsOrigin { value: raw }),
            }
        })
        .collect()
}

fn resolve_runner(
    env: &EnvConfig,
    file: FileRunnerConfig,
    warnings: &mut ConfigWarnings,
) -> Result<RunnerConfig, ConfigLoadError> {
    let runner_id = match env.runner_id.clone().or(file.runner_id) {
        Some(id) => id,
        None => {
            let generated = Uuid::new_v4().to_string();
            warnings.push_with_hint(
                format!("RUNNER_ID not set; using generated id {generated}"),
                "Pin RUNNER_ID so restarts keep the same lock identity",
            );
            generated
        }
    };

    let takeover = match env.runner_takeover.as_deref() {
        Some(raw) => raw
            .parse::<TakeoverMode>()
            .map_err(|_| ConfigLoadError::InvalidTakeover { value: raw.to_string() })?,
        None => file.takeover.unwrap_or_default(),
    };

    Ok(RunnerConfig {
        runner_id,
        heartbeat_interval: duration_setting(
            "runner.heartbeat_interval",
            env.runner_heartbeat_interval.as_deref(),
            file.heartbeat_interval.as_deref(),
        )?
        .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL),
        standby_poll_interval: duration_setting(
            "runner.standby_poll_interval",
            env.runner_standby_poll_interval.as_deref(),
            file.standby_poll_interval.as_deref(),
        )?
        .unwrap_or(DEFAULT_STANDBY_POLL_INTERVAL),
        takeover,
    })
}

fn resolve_license(
    env: &EnvConfig,
    file: FileLicenseConfig,
) -> Result<LicenseConfig, ConfigLoadError> {
    let defaults = LicensePolicy::default();
    let policy_duration = |key: &'static str,
                           env_value: Option<&str>,
                           file_value: Option<&str>,
                           default: chrono::Duration| {
        match duration_setting(key, env_value, file_value)? {
            Some(duration) => chrono::Duration::from_std(duration)
                .map_err(|_| ConfigLoadError::DurationOutOfRange { key }),
            None => Ok(default),
        }
    };

    let policy = LicensePolicy {
        lease: policy_duration(
            "license.lease",
            env.license_lease.as_deref(),
            file.lease.as_deref(),
            defaults.lease,
        )?,
        check_in_window: policy_duration(
            "license.check_in_window",
            env.license_check_in_window.as_deref(),
            file.check_in_window.as_deref(),
            defaults.check_in_window,
        )?,
        grace_tolerance: policy_duration(
            "license.grace_tolerance",
            env.license_grace_tolerance.as_deref(),
            file.grace_tolerance.as_deref(),
            defaults.grace_tolerance,
        )?,
        cascade_attempts: env
            .license_cascade_attempts
            .or(file.cascade_attempts)
            .unwrap_or(defaults.cascade_attempts)
            .max(1),
    };

    Ok(LicenseConfig {
        secret_key: env
            .license_secret_key
            .clone()
            .or(file.secret_key)
            .filter(|value| !value.trim().is_empty()),
        policy,
    })
}

/// Environment wins over the file. Zero is rejected.
fn duration_setting(
    key: &'static str,
    env_value: Option<&str>,
    file_value: Option<&str>,
) -> Result<Option<Duration>, ConfigLoadError> {
    let Some(raw) = env_value.or(file_value) else {
        return Ok(None);
    };
    let duration = humantime::parse_duration(raw.trim()).map_err(|source| {
        ConfigLoadError::InvalidDuration {
            key,
            value: raw.to_string(),
            source,
        }
    })?;
    if duration.is_zero() {
        return Err(ConfigLoadError::ZeroDuration { key });
    }
    Ok(Some(duration))
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid database URL")]
    InvalidDatabaseUrl {
        #[source]
        source: url::ParseError,
    },
    #[error("invalid duration '{value}' for {key}")]
    InvalidDuration {
        key: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("{key} must be greater than zero")]
    ZeroDuration { key: &'static str },
    #[error("{key} is too large")]
    DurationOutOfRange { key: &'static str },
    #[error("invalid CORS origin '{value}' (expected * or an http(s) origin)")]
    InvalidCorsOrigin { value: String },
    #[error("invalid runner takeover mode '{value}' (expected atomic or legacy)")]
    InvalidTakeover { value: String },
    #[error("LICENSE_SECRET_KEY is required to serve the license API")]
    MissingSecretKey,
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn is_empty(&self) -> bool {
        self.explicit.is_none() && self.env.is_none() && self.default.is_none()
    }

    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> EnvConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|name| vars.get(name).cloned())
    }

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("onair.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let dir = TempDir::new().unwrap();
        let load = ConfigLoader::new()
            .with_config_path(write_config(&dir, ""))
            .load_from_env(env(&[("RUNNER_ID", "runner-a")]))
            .unwrap();
        let config = load.config;

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.runner.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.runner.standby_poll_interval, Duration::from_secs(5));
        assert_eq!(config.runner.takeover, TakeoverMode::Atomic);
        assert_eq!(config.license.policy, LicensePolicy::default());
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
            [server]
            port = 8080

            [runner]
            runner_id = "from-file"
            heartbeat_interval = "10s"
            takeover = "legacy"

            [license]
            secret_key = "file-key"
            grace_tolerance = "2h"
            "#,
        );

        let config = ConfigLoader::new()
            .with_config_path(path.clone())
            .load_from_env(env(&[
                ("SERVER_PORT", "9090"),
                ("RUNNER_TAKEOVER", "atomic"),
                ("LICENSE_LEASE", "15m"),
            ]))
            .unwrap()
            .config;

        assert_eq!(config.server.port, 9090);
        assert!(config.server.cors_allowed_origins.is_empty());
        assert_eq!(config.runner.runner_id, "from-file");
        assert_eq!(config.runner.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.runner.takeover, TakeoverMode::Atomic);
        assert_eq!(config.license.secret_key.as_deref(), Some("file-key"));
        assert_eq!(config.license.policy.lease, chrono::Duration::minutes(15));
        assert_eq!(config.license.policy.grace_tolerance, chrono::Duration::hours(2));
        assert_eq!(config.metadata.config_path, Some(path));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::new()
            .with_config_path(dir.path().join("absent.toml"))
            .load_from_env(EnvConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn bad_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let loader = ConfigLoader::new().with_config_path(path);

        let err = loader
            .load_from_env(env(&[("RUNNER_HEARTBEAT_INTERVAL", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidDuration { key, .. } if key == "runner.heartbeat_interval"));

        let err = loader
            .load_from_env(env(&[("LICENSE_CHECK_IN_WINDOW", "0s")]))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::ZeroDuration { .. }));

        let err = loader
            .load_from_env(env(&[("RUNNER_TAKEOVER", "optimistic")]))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidTakeover { .. }));

        let err = loader
            .load_from_env(env(&[("DATABASE_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidDatabaseUrl { .. }));
    }

    #[test]
    fn generated_runner_id_is_reported() {
        let dir = TempDir::new().unwrap();
        let load = ConfigLoader::new()
            .with_config_path(write_config(&dir, ""))
            .load_from_env(EnvConfig::default())
            .unwrap();

        assert!(Uuid::parse_str(&load.config.runner.runner_id).is_ok());
        assert_eq!(load.warnings.items.len(), 1);
    }

    #[test]
    fn cors_origins_are_normalized_and_validated() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
            [server]
            cors_allowed_origins = ["https://admin.example.com/", "http://localhost:5173"]
            "#,
        );
        let loader = ConfigLoader::new().with_config_path(path);

        let config = loader.load_from_env(env(&[])).unwrap().config;
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["https://admin.example.com", "http://localhost:5173"]
        );

        let config = loader
            .load_from_env(env(&[("SERVER_CORS_ALLOWED_ORIGINS", " * ,")]))
            .unwrap()
            .config;
        assert_eq!(config.server.cors_allowed_origins, vec!["*"]);

        let err = loader
            .load_from_env(env(&[("SERVER_CORS_ALLOWED_ORIGINS", "ftp://files.example.com")]))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidCorsOrigin { .. }));
    }
}
