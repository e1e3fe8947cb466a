//! Startup configuration: an optional TOML file, `.env`, then the process
//! environment, composed once into an explicit [`Config`].

pub mod loader;
pub mod models;
pub mod sources;

pub use loader::{
    ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
    ConfigWarning, ConfigWarnings,
};
pub use models::{
    Config, ConfigMetadata, DatabaseConfig, LicenseConfig, RunnerConfig,
    ServerConfig,
};
pub use sources::{EnvConfig, FileConfig};
