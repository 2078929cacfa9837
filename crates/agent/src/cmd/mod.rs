//! CLI commands

pub mod check;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use spool_config::Config;

/// Paths tried when no `--config` is given
const DEFAULT_CONFIG_PATHS: &[&str] = &["spool.toml", "configs/spool.toml"];

/// Load the config named on the command line, or the first default path
/// that exists
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        // User explicitly provided config path - must exist
        if !path.exists() {
            bail!("config file not found: {}", path.display());
        }
        return Config::from_file(path).context("failed to load configuration");
    }

    for candidate in DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from) {
        if candidate.exists() {
            tracing::info!(config = %candidate.display(), "using config file");
            return Config::from_file(&candidate).context("failed to load configuration");
        }
    }

    bail!(
        "no config file given and none found at {}",
        DEFAULT_CONFIG_PATHS.join(", ")
    )
}
