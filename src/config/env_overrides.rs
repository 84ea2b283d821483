//! Single-value overrides from `ANALYTICS_*` environment variables.

use super::EngineConfig;
use crate::domain::compensation::calculator::TerminalProvisionPolicy;
use crate::domain::gamification::streak::StreakAnchor;
use anyhow::{Context, Result};
use std::str::FromStr;

/// Values present in the environment, applied on top of file or default config
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub terminal_policy: Option<TerminalProvisionPolicy>,
    pub streak_anchor: Option<StreakAnchor>,
    pub stuck_threshold_days: Option<u32>,
    pub points_per_go_live: Option<u64>,
    pub challenge_fallback_points: Option<u64>,
}

impl EnvOverrides {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            terminal_policy: Self::parse(&lookup, "ANALYTICS_TERMINAL_POLICY")?,
            streak_anchor: Self::parse(&lookup, "ANALYTICS_STREAK_ANCHOR")?,
            stuck_threshold_days: Self::parse(&lookup, "ANALYTICS_STUCK_THRESHOLD_DAYS")?,
            points_per_go_live: Self::parse(&lookup, "ANALYTICS_POINTS_PER_GO_LIVE")?,
            challenge_fallback_points: Self::parse(&lookup, "ANALYTICS_CHALLENGE_FALLBACK_POINTS")?,
        })
    }

    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(policy) = self.terminal_policy {
            config.commission.terminal_policy = policy;
        }
        if let Some(anchor) = self.streak_anchor {
            config.streak.anchor = anchor;
        }
        if let Some(days) = self.stuck_threshold_days {
            config.forecast.stuck_threshold_days = days;
        }
        if let Some(points) = self.points_per_go_live {
            config.rewards.weights.per_go_live = points;
        }
        if let Some(points) = self.challenge_fallback_points {
            config.rewards.weights.challenge_fallback = points;
        }
    }

    fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        anyhow::Error: From<T::Err>,
        F: Fn(&str) -> Option<String>,
    {
        lookup(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(anyhow::Error::from)
                    .context(format!("Failed to parse {}", key))
            })
            .transpose()
    }
}
