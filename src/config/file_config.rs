//! TOML configuration file loading.

use super::EngineConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const CONFIG_FILE_VAR: &str = "ANALYTICS_CONFIG_FILE";

pub(super) fn load(path: &Path) -> Result<EngineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse(&content).with_context(|| format!("Invalid config file {}", path.display()))?;
    debug!("EngineConfig: loaded {}", path.display());
    Ok(config)
}

pub(super) fn parse(content: &str) -> Result<EngineConfig> {
    toml::from_str(content).context("Failed to parse TOML configuration")
}
