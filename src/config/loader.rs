// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ExperimentConfig, RawExperimentFile};
use crate::errors::Result;

/// Load an experiment file from a given path and return the raw
/// `RawExperimentFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (list alignment, sweep sanity, etc.). Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawExperimentFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawExperimentFile = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load an experiment file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Aligns parameter lists to the grating position list (broadcast /
///   truncate).
/// - Checks sweep and batch sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ExperimentConfig> {
    let raw = load_from_path(&path)?;
    let config = ExperimentConfig::try_from(raw)?;
    Ok(config)
}

/// Helper to resolve a default experiment file path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Specflow.toml")
}
