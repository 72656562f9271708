pub mod settings;

pub use settings::*;

use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {}", .0.join(", "))]
    Invalid(Vec<String>),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads settings in layers: built-in defaults, then the TOML file at `path`
/// if present, then `REPORTER__SECTION__KEY` environment variables.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let defaults = toml::to_string(&AgentConfig::default())?;
    let settings = Config::builder()
        .add_source(File::from_str(&defaults, FileFormat::Toml))
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("REPORTER")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let config: AgentConfig = settings.try_deserialize()?;
    config.validate().map_err(ConfigError::Invalid)?;

    debug!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Writes the default configuration as TOML.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(&AgentConfig::default())?;
    std::fs::write(path, rendered)?;
    Ok(())
}
