//! Engine configuration.
//!
//! Defaults come from the domain types, an optional TOML file replaces them,
//! and `ANALYTICS_*` environment variables override individual values.

mod env_overrides;
mod file_config;

pub use env_overrides::EnvOverrides;
pub use file_config::CONFIG_FILE_VAR;

use crate::domain::compensation::calculator::CommissionPolicy;
use crate::domain::gamification::rewards::RewardSettings;
use crate::domain::gamification::streak::StreakPolicy;
use crate::domain::pipeline::forecast::ForecastSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Tunables for every calculator in the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub commission: CommissionPolicy,
    pub streak: StreakPolicy,
    pub forecast: ForecastSettings,
    pub rewards: RewardSettings,
}

impl EngineConfig {
    /// Load configuration from `.env`, the process environment and the
    /// optional file named by `ANALYTICS_CONFIG_FILE`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        let overrides =
            EnvOverrides::from_lookup(&lookup).context("Failed to parse ANALYTICS_* overrides")?;
        overrides.apply(&mut config);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        file_config::load(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        file_config::parse(content)
    }
}
