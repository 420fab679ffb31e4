// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{CoordinatorConfig, RawCoordinatorConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawCoordinatorConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawCoordinatorConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    debug!(path = %path.display(), "read configuration file");

    let config: RawCoordinatorConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks demo timings and execution settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<CoordinatorConfig> {
    let raw_config = load_from_path(&path)?;
    let config = CoordinatorConfig::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate configuration held in memory.
pub fn from_toml_str(contents: &str) -> Result<CoordinatorConfig> {
    let raw_config: RawCoordinatorConfig = toml::from_str(contents)?;
    CoordinatorConfig::try_from(raw_config)
}
