use crate::config::EngineConfig;
use crate::domain::access::{AggregationScope, Permissions, Viewer};
use crate::domain::compensation::calculator::{
    CommissionCalculator, CompensationSummary, UserBook, YearSummary, YtdSummary,
};
use crate::domain::errors::AnalyticsError;
use crate::domain::gamification::badges::{BadgeEvaluator, BadgeHistory, EarnedBadge, default_catalogue};
use crate::domain::gamification::challenge::{
    Challenge, ChallengeProgress, ChallengeProgressEngine, ChallengeStatus, LeaderboardEntry,
};
use crate::domain::gamification::rewards::{RewardLevel, RewardScorer, RewardTotals};
use crate::domain::pipeline::Opportunity;
use crate::domain::pipeline::forecast::{ForecastResult, PipelineForecastEngine};
use crate::domain::primitives::MONTHS_PER_YEAR;
use crate::domain::sales::{QuotaSettings, SalesEvent, UserId};
use chrono::{DateTime, Datelike, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};
use uuid::Uuid;

/// Raw inputs for one dashboard computation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSnapshot {
    pub events: Vec<SalesEvent>,
    pub settings: Vec<QuotaSettings>,
    pub challenges: Vec<Challenge>,
    pub opportunities: Vec<Opportunity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPerformance {
    pub user_id: UserId,
    pub year_summary: YearSummary,
    pub ytd_summary: YtdSummary,
    pub badges: Vec<EarnedBadge>,
    pub rewards: RewardTotals,
    pub level: RewardLevel,
    pub completed_challenges: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeBoard {
    pub name: String,
    pub icon: String,
    pub progress: ChallengeProgress,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedView {
    pub year_summary: YearSummary,
    pub ytd_summary: YtdSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub viewer: Viewer,
    pub permissions: Permissions,
    pub scope: AggregationScope,
    pub year: i32,
    pub as_of: DateTime<Utc>,
    /// Month the YTD figures run through, 0 for a future year
    pub ytd_month: u32,
    pub users: BTreeMap<UserId, UserPerformance>,
    /// Present when the viewer may see the all-users figures
    pub combined: Option<CombinedView>,
    pub challenges: Vec<ChallengeBoard>,
    pub forecast: ForecastResult,
}

/// Assembles dashboards from snapshots; holds no state between calls.
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    calculator: CommissionCalculator,
    challenges: ChallengeProgressEngine,
    badges: BadgeEvaluator,
    rewards: RewardScorer,
    forecast: PipelineForecastEngine,
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl AnalyticsService {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            calculator: CommissionCalculator::new(config.commission),
            challenges: ChallengeProgressEngine::new(config.streak),
            badges: BadgeEvaluator::new(default_catalogue(), config.streak),
            rewards: RewardScorer::new(config.rewards.clone()),
            forecast: PipelineForecastEngine::new(config.forecast.clone()),
        }
    }

    pub fn dashboard(
        &self,
        snapshot: &AnalyticsSnapshot,
        viewer: Viewer,
        year: i32,
        as_of: DateTime<Utc>,
    ) -> Result<Dashboard, AnalyticsError> {
        let permissions = viewer.permissions();
        let scope = viewer.scope();
        let ytd_month = ytd_month(year, as_of);

        let ledger = Ledger::new(snapshot);
        let users: Vec<UserId> = ledger
            .users
            .iter()
            .copied()
            .filter(|u| scope.includes(u))
            .collect();

        // Challenges are team-wide, whatever the viewer's scope, and are
        // scored against the plans of the years their window touches
        let all_settings = ledger.all_settings();
        let progress: Vec<(&Challenge, ChallengeProgress)> = snapshot
            .challenges
            .par_iter()
            .map(|challenge| {
                let progress = self
                    .challenges
                    .evaluate(challenge, &snapshot.events, &all_settings, as_of);
                (challenge, progress)
            })
            .collect();

        let performances: BTreeMap<UserId, UserPerformance> = users
            .par_iter()
            .map(|user| (*user, self.user_performance(*user, &ledger, &progress, year, ytd_month)))
            .collect();

        let combined = if permissions.view_combined {
            Some(self.combined_view(&ledger, &users, year, ytd_month)?)
        } else {
            None
        };

        let opportunities: Vec<Opportunity> = snapshot
            .opportunities
            .iter()
            .filter(|o| scope.includes(&o.owner_id))
            .cloned()
            .collect();
        let forecast = self.forecast.forecast(&opportunities, as_of);

        let challenges = progress
            .into_iter()
            .map(|(challenge, progress)| ChallengeBoard {
                name: challenge.name.clone(),
                icon: challenge.icon.clone(),
                leaderboard: progress.leaderboard(),
                progress,
            })
            .collect();

        info!(
            "Dashboard for {} ({:?}): {} users, {} challenges, {} opportunities, year {} through month {}",
            viewer.user_id,
            viewer.role,
            performances.len(),
            snapshot.challenges.len(),
            opportunities.len(),
            year,
            ytd_month
        );

        Ok(Dashboard {
            viewer,
            permissions,
            scope,
            year,
            as_of,
            ytd_month,
            users: performances,
            combined,
            challenges,
            forecast,
        })
    }

    fn user_performance(
        &self,
        user: UserId,
        ledger: &Ledger,
        progress: &[(&Challenge, ChallengeProgress)],
        year: i32,
        ytd_month: u32,
    ) -> UserPerformance {
        let events = ledger.events_of(&user);
        let settings = ledger.settings_of(user, year);

        let year_summary = self.calculator.year_summary(events, &settings);
        let ytd_summary = self.calculator.ytd_summary(events, &settings, ytd_month);

        // Badge rules look at every configured year
        let summaries: Vec<CompensationSummary> = ledger
            .all_settings_of(&user)
            .map(|s| self.calculator.year_summary(events, s))
            .collect();

        let completed: Vec<&Challenge> = progress
            .iter()
            .filter(|(_, p)| p.status != ChallengeStatus::Inactive && p.completed_by(&user))
            .map(|(challenge, _)| *challenge)
            .collect();

        let badges = self.badges.evaluate(&BadgeHistory {
            events,
            summaries: &summaries,
            completed_challenges: completed.len(),
        });
        let rewards = self.rewards.calculate_points(user, events, &badges, &completed);
        let level = self.rewards.reward_level(rewards.total);

        UserPerformance {
            user_id: user,
            year_summary,
            ytd_summary,
            badges,
            rewards,
            level,
            completed_challenges: completed.iter().map(|c| c.id).collect(),
        }
    }

    fn combined_view(
        &self,
        ledger: &Ledger,
        users: &[UserId],
        year: i32,
        ytd_month: u32,
    ) -> Result<CombinedView, AnalyticsError> {
        let settings: Vec<QuotaSettings> = users.iter().map(|u| ledger.settings_of(*u, year)).collect();
        let books: Vec<UserBook<'_>> = users
            .iter()
            .zip(&settings)
            .map(|(user, settings)| UserBook {
                settings,
                events: ledger.events_of(user),
            })
            .collect();

        Ok(CombinedView {
            year_summary: self.calculator.combined_summary(year, &books, MONTHS_PER_YEAR)?,
            ytd_summary: self.calculator.combined_summary(year, &books, ytd_month)?,
        })
    }
}

/// Events and settings of a snapshot indexed by user
struct Ledger {
    users: BTreeSet<UserId>,
    events: BTreeMap<UserId, Vec<SalesEvent>>,
    settings: BTreeMap<(UserId, i32), QuotaSettings>,
}

impl Ledger {
    fn new(snapshot: &AnalyticsSnapshot) -> Self {
        let mut events: BTreeMap<UserId, Vec<SalesEvent>> = BTreeMap::new();
        for event in &snapshot.events {
            events.entry(event.user_id).or_default().push(event.clone());
        }

        let mut settings = BTreeMap::new();
        for entry in &snapshot.settings {
            let key = (entry.user_id, entry.year());
            if settings.insert(key, entry.clone()).is_some() {
                warn!(
                    "Duplicate quota settings for {} in {}, keeping the last entry",
                    key.0, key.1
                );
            }
        }

        let users = events
            .keys()
            .copied()
            .chain(settings.keys().map(|(user, _)| *user))
            .collect();

        Self {
            users,
            events,
            settings,
        }
    }

    fn events_of(&self, user: &UserId) -> &[SalesEvent] {
        self.events.get(user).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Settings for `year`, or an unconfigured plan with zero targets.
    fn settings_of(&self, user: UserId, year: i32) -> QuotaSettings {
        self.settings
            .get(&(user, year))
            .cloned()
            .unwrap_or_else(|| QuotaSettings::unconfigured(user, year))
    }

    fn all_settings_of<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a QuotaSettings> + 'a {
        self.settings
            .iter()
            .filter(move |((owner, _), _)| owner == user)
            .map(|(_, settings)| settings)
    }

    fn all_settings(&self) -> Vec<QuotaSettings> {
        self.settings.values().cloned().collect()
    }
}

/// Months of `year` already started at `as_of`.
fn ytd_month(year: i32, as_of: DateTime<Utc>) -> u32 {
    match year.cmp(&as_of.year()) {
        std::cmp::Ordering::Less => MONTHS_PER_YEAR,
        std::cmp::Ordering::Equal => as_of.month(),
        std::cmp::Ordering::Greater => 0,
    }
}
