//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_load;
pub use validate::run_validate;

use anyhow::{Context, Result};
use contracts::LoaderConfig;
use std::path::Path;
use tracing::info;

/// Load a config file, or fall back to built-in defaults
pub(crate) fn load_config(path: Option<&Path>) -> Result<LoaderConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(LoaderConfig::default());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
