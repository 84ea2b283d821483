use super::badges::{BadgeRarity, EarnedBadge};
use super::challenge::{Challenge, RewardType};
use crate::domain::primitives::percent;
use crate::domain::sales::{SalesEvent, UserId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Points per achievement kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    pub per_go_live: u64,
    pub common_badge: u64,
    pub rare_badge: u64,
    pub epic_badge: u64,
    pub legendary_badge: u64,
    /// For completed challenges whose reward is not points
    pub challenge_fallback: u64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            per_go_live: 10,
            common_badge: 10,
            rare_badge: 25,
            epic_badge: 50,
            legendary_badge: 100,
            challenge_fallback: 50,
        }
    }
}

impl RewardWeights {
    pub fn badge_points(&self, rarity: BadgeRarity) -> u64 {
        match rarity {
            BadgeRarity::Common => self.common_badge,
            BadgeRarity::Rare => self.rare_badge,
            BadgeRarity::Epic => self.epic_badge,
            BadgeRarity::Legendary => self.legendary_badge,
        }
    }
}

/// One rung of the level ladder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStep {
    pub threshold: u64,
    pub name: String,
    pub icon: String,
}

impl LevelStep {
    fn new(threshold: u64, name: &str, icon: &str) -> Self {
        Self {
            threshold,
            name: name.to_string(),
            icon: icon.to_string(),
        }
    }
}

pub fn default_ladder() -> Vec<LevelStep> {
    vec![
        LevelStep::new(0, "Rookie", "🌱"),
        LevelStep::new(100, "Rising Star", "⭐"),
        LevelStep::new(300, "Closer", "🔥"),
        LevelStep::new(700, "Pro", "💎"),
        LevelStep::new(1500, "Champion", "🏆"),
        LevelStep::new(3000, "Legend", "👑"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSettings {
    pub weights: RewardWeights,
    /// Ascending by threshold, starting at 0
    pub levels: Vec<LevelStep>,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            weights: RewardWeights::default(),
            levels: default_ladder(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub go_lives: u64,
    pub badges: u64,
    pub challenges: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTotals {
    pub breakdown: PointsBreakdown,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardLevel {
    pub current: LevelStep,
    pub next: Option<LevelStep>,
    pub points_to_next: u64,
    pub progress_percent: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct RewardScorer {
    settings: RewardSettings,
}

impl RewardScorer {
    pub fn new(settings: RewardSettings) -> Self {
        Self { settings }
    }

    pub fn calculate_points(
        &self,
        user: UserId,
        events: &[SalesEvent],
        badges: &[EarnedBadge],
        completed_challenges: &[&Challenge],
    ) -> RewardTotals {
        let weights = &self.settings.weights;
        let go_live_count = events.iter().filter(|e| e.user_id == user).count() as u64;

        // totals saturate at u64::MAX
        let breakdown = PointsBreakdown {
            go_lives: go_live_count.saturating_mul(weights.per_go_live),
            badges: badges
                .iter()
                .map(|b| weights.badge_points(b.rarity))
                .fold(0, u64::saturating_add),
            challenges: completed_challenges
                .iter()
                .map(|c| self.challenge_points(c))
                .fold(0, u64::saturating_add),
        };
        let total = breakdown
            .go_lives
            .saturating_add(breakdown.badges)
            .saturating_add(breakdown.challenges);

        RewardTotals { breakdown, total }
    }

    fn challenge_points(&self, challenge: &Challenge) -> u64 {
        match challenge.reward_type {
            RewardType::Points => challenge.reward_value.trunc().to_u64().unwrap_or(0),
            RewardType::Badge | RewardType::Prize => self.settings.weights.challenge_fallback,
        }
    }

    /// Highest ladder step reached and linear progress towards the next one.
    pub fn reward_level(&self, total_points: u64) -> RewardLevel {
        let levels = &self.settings.levels;
        let current = levels
            .iter()
            .rev()
            .find(|step| step.threshold <= total_points)
            .or_else(|| levels.first())
            .cloned()
            .unwrap_or_default();
        let next = levels
            .iter()
            .find(|step| step.threshold > total_points && step.threshold > current.threshold)
            .cloned();

        match next {
            Some(next) => {
                let gained = total_points.saturating_sub(current.threshold);
                let span = next.threshold - current.threshold;
                RewardLevel {
                    points_to_next: next.threshold - total_points,
                    progress_percent: percent(Decimal::from(gained), Decimal::from(span)),
                    current,
                    next: Some(next),
                }
            }
            None => RewardLevel {
                current,
                next: None,
                points_to_next: 0,
                progress_percent: Decimal::ONE_HUNDRED,
            },
        }
    }
}
