// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a plan file and return the raw [`RawConfigFile`].
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// the config-level checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a plan file from path and validate it.
///
/// Graph-level problems (unknown ids, cycles) surface later, when the
/// planner builds the dependency graph.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default plan file location: `Batchdag.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Batchdag.toml")
}
