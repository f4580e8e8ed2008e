// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{DaemonConfig, RawDaemonConfig};
use crate::errors::Result;

/// Read a TOML config file into a `RawDaemonConfig`.
///
/// Only deserialization happens here; see [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawDaemonConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawDaemonConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Build the validated daemon configuration.
///
/// - Reads `path` if given (missing file is an error).
/// - Layers `overrides` (normally the command-line flags) on top.
/// - Validates the result: at least one filter, at least one action, sane
///   values everywhere.
pub fn load_and_validate(
    path: Option<&Path>,
    overrides: RawDaemonConfig,
) -> Result<DaemonConfig> {
    let base = match path {
        Some(p) => load_from_path(p)?,
        None => RawDaemonConfig::default(),
    };
    DaemonConfig::try_from(base.merged_with(overrides))
}
