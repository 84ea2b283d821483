use super::streak::{StreakPolicy, StreakResult, StreakTracker, daily_go_lives};
use crate::domain::primitives::{months_spanned, percent, start_of_day};
use crate::domain::sales::{QuotaSettings, SalesEvent, UserId};
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    Team,
    Individual,
    Streak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeMetric {
    GoLives,
    SubsArr,
    PayArr,
    TotalArr,
    Terminals,
    /// Percentage of the subscription target over the months the window touches
    Achievement,
    PremiumGoLives,
    DailyGoLive,
}

impl ChallengeMetric {
    fn value_of(self, event: &SalesEvent) -> Decimal {
        match self {
            ChallengeMetric::GoLives | ChallengeMetric::DailyGoLive => Decimal::ONE,
            ChallengeMetric::SubsArr | ChallengeMetric::Achievement => event.subs_arr,
            ChallengeMetric::PayArr => event.pay_arr,
            ChallengeMetric::TotalArr => event.total_arr(),
            ChallengeMetric::Terminals => flag(event.has_terminal),
            ChallengeMetric::PremiumGoLives => flag(event.premium),
        }
    }
}

fn flag(value: bool) -> Decimal {
    if value { Decimal::ONE } else { Decimal::ZERO }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    Points,
    Badge,
    Prize,
}

/// A time-boxed competition defined by an administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    pub challenge_type: ChallengeType,
    pub metric: ChallengeMetric,
    pub target_value: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reward_type: RewardType,
    #[serde(default)]
    pub reward_value: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Go-lives a day needs to count towards a streak
    #[serde(default = "default_min_per_day")]
    pub streak_min_per_day: u32,
}

fn default_icon() -> String {
    "🏆".to_string()
}

fn default_active() -> bool {
    true
}

fn default_min_per_day() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Inactive,
    Upcoming,
    Active,
    Completed,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub challenge_id: Uuid,
    pub challenge_type: ChallengeType,
    pub current_value: Decimal,
    pub target_value: Decimal,
    /// Uncapped, 120 means 20% over target
    pub progress_percent: Decimal,
    pub is_completed: bool,
    pub status: ChallengeStatus,
    pub days_remaining: i64,
    /// Team: contribution to the pool. Individual: own total.
    /// Streak: own best streak.
    pub user_progress: BTreeMap<UserId, Decimal>,
    /// Timeline of the user holding the longest streak
    pub streak: Option<StreakResult>,
}

impl ChallengeProgress {
    /// Users ordered by their value, highest first; ties by user id.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<(&UserId, &Decimal)> = self.user_progress.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        entries
            .into_iter()
            .enumerate()
            .map(|(idx, (user_id, value))| LeaderboardEntry {
                rank: idx as u32 + 1,
                user_id: *user_id,
                value: *value,
            })
            .collect()
    }

    /// Whether `user` earned this challenge's reward.
    pub fn completed_by(&self, user: &UserId) -> bool {
        let own = self.user_progress.get(user).copied().unwrap_or(Decimal::ZERO);
        match self.challenge_type {
            ChallengeType::Team => self.is_completed && own > Decimal::ZERO,
            ChallengeType::Individual | ChallengeType::Streak => own >= self.target_value,
        }
    }
}

/// Evaluates challenges against a snapshot of sales events.
///
/// Time enters only through `as_of`. Once `as_of` passes the end date the
/// result no longer depends on it.
#[derive(Debug, Clone, Default)]
pub struct ChallengeProgressEngine {
    streak_policy: StreakPolicy,
}

impl ChallengeProgressEngine {
    pub fn new(streak_policy: StreakPolicy) -> Self {
        Self { streak_policy }
    }

    /// Scores `challenge` over `events`.
    ///
    /// `settings` may span several years; achievement targets are taken
    /// from the plan whose year matches each month of the window.
    pub fn evaluate(
        &self,
        challenge: &Challenge,
        events: &[SalesEvent],
        settings: &[QuotaSettings],
        as_of: DateTime<Utc>,
    ) -> ChallengeProgress {
        let in_window: Vec<&SalesEvent> = events
            .iter()
            .filter(|e| e.is_within(challenge.start_date, challenge.end_date))
            .collect();
        let window_years: BTreeSet<i32> = months_spanned(challenge.start_date, challenge.end_date)
            .into_iter()
            .map(|(year, _)| year)
            .collect();
        let participants: BTreeSet<UserId> = settings
            .iter()
            .filter(|s| window_years.contains(&s.year()))
            .map(|s| s.user_id)
            .chain(in_window.iter().map(|e| e.user_id))
            .collect();

        let (current_value, user_progress, streak) = match challenge.challenge_type {
            ChallengeType::Streak => {
                let tracker = StreakTracker::new(challenge.streak_min_per_day, self.streak_policy);
                let window = self.streak_window(challenge, as_of);
                let streak_of = |user: Option<UserId>| {
                    window
                        .map(|(start, end)| {
                            let own = in_window
                                .iter()
                                .copied()
                                .filter(|e| Some(e.user_id) == user);
                            tracker.compute(&daily_go_lives(own, start, end))
                        })
                        .unwrap_or_default()
                };

                let streaks: BTreeMap<UserId, StreakResult> = participants
                    .iter()
                    .map(|user| (*user, streak_of(Some(*user))))
                    .collect();
                // longest run wins, ties go to the lower user id
                let leader = streaks.iter().max_by(|a, b| {
                    a.1.best_streak
                        .cmp(&b.1.best_streak)
                        .then_with(|| b.0.cmp(a.0))
                });
                let shown = leader
                    .map(|(_, streak)| streak.clone())
                    .unwrap_or_else(|| streak_of(None));
                let user_progress = streaks
                    .iter()
                    .map(|(user, streak)| (*user, Decimal::from(streak.best_streak)))
                    .collect();
                (Decimal::from(shown.best_streak), user_progress, Some(shown))
            }
            ChallengeType::Team | ChallengeType::Individual => {
                let totals = self.metric_totals(challenge, &in_window, &participants);
                let user_progress = match challenge.metric {
                    ChallengeMetric::Achievement => {
                        self.achievement_progress(challenge, &totals, settings)
                    }
                    _ => totals,
                };
                let current_value = match challenge.challenge_type {
                    ChallengeType::Team => user_progress.values().copied().sum(),
                    _ => user_progress
                        .values()
                        .copied()
                        .max()
                        .unwrap_or(Decimal::ZERO),
                };
                (current_value, user_progress, None)
            }
        };

        let is_completed = current_value >= challenge.target_value;
        let progress = ChallengeProgress {
            challenge_id: challenge.id,
            challenge_type: challenge.challenge_type,
            current_value,
            target_value: challenge.target_value,
            progress_percent: percent(current_value, challenge.target_value),
            is_completed,
            status: status(challenge, is_completed, as_of.date_naive()),
            days_remaining: days_remaining(challenge.end_date, as_of),
            user_progress,
            streak,
        };

        tracing::debug!(
            "Challenge '{}' ({}): {} of {} ({}%), {:?}",
            challenge.name,
            challenge.id,
            progress.current_value,
            progress.target_value,
            progress.progress_percent.round_dp(1),
            progress.status
        );
        progress
    }

    /// The challenge as seen by one user: only their events and settings.
    pub fn evaluate_for_user(
        &self,
        challenge: &Challenge,
        user: UserId,
        events: &[SalesEvent],
        settings: &[QuotaSettings],
        as_of: DateTime<Utc>,
    ) -> ChallengeProgress {
        let own_events: Vec<SalesEvent> = events
            .iter()
            .filter(|e| e.user_id == user)
            .cloned()
            .collect();
        let mut own_settings: Vec<QuotaSettings> = settings
            .iter()
            .filter(|s| s.user_id == user)
            .cloned()
            .collect();
        if own_settings.is_empty() {
            own_settings.push(QuotaSettings::unconfigured(user, challenge.start_date.year()));
        }
        self.evaluate(challenge, &own_events, &own_settings, as_of)
    }

    fn metric_totals(
        &self,
        challenge: &Challenge,
        in_window: &[&SalesEvent],
        participants: &BTreeSet<UserId>,
    ) -> BTreeMap<UserId, Decimal> {
        let mut totals: BTreeMap<UserId, Decimal> =
            participants.iter().map(|u| (*u, Decimal::ZERO)).collect();
        for event in in_window {
            *totals.entry(event.user_id).or_insert(Decimal::ZERO) +=
                challenge.metric.value_of(event);
        }
        totals
    }

    /// Subscription ARR as a percentage of target.
    ///
    /// Team: each contribution is measured against the pooled target, so the
    /// contributions add up to the team percentage. Individual: against the
    /// user's own target.
    fn achievement_progress(
        &self,
        challenge: &Challenge,
        subs_by_user: &BTreeMap<UserId, Decimal>,
        settings: &[QuotaSettings],
    ) -> BTreeMap<UserId, Decimal> {
        let months = months_spanned(challenge.start_date, challenge.end_date);
        let mut targets: BTreeMap<UserId, Decimal> = BTreeMap::new();
        for plan in settings {
            let in_window: Decimal = months
                .iter()
                .filter(|(year, _)| *year == plan.year())
                .map(|(_, month)| plan.targets.subs[(*month - 1) as usize])
                .sum();
            *targets.entry(plan.user_id).or_insert(Decimal::ZERO) += in_window;
        }

        match challenge.challenge_type {
            ChallengeType::Team => {
                let pooled_target: Decimal = targets.values().copied().sum();
                subs_by_user
                    .iter()
                    .map(|(user, subs)| (*user, percent(*subs, pooled_target)))
                    .collect()
            }
            _ => subs_by_user
                .iter()
                .map(|(user, subs)| {
                    let target = targets.get(user).copied().unwrap_or(Decimal::ZERO);
                    (*user, percent(*subs, target))
                })
                .collect(),
        }
    }

    /// Inclusive days of the window that have started by `as_of`.
    fn streak_window(
        &self,
        challenge: &Challenge,
        as_of: DateTime<Utc>,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let end = challenge.end_date.min(as_of.date_naive());
        (challenge.start_date <= end).then_some((challenge.start_date, end))
    }
}

/// Whole days until the end date is over; zero once it has passed.
fn days_remaining(end_date: NaiveDate, as_of: DateTime<Utc>) -> i64 {
    let closes_at = start_of_day(end_date) + TimeDelta::days(1);
    (closes_at - as_of).num_days().max(0)
}

fn status(challenge: &Challenge, is_completed: bool, today: NaiveDate) -> ChallengeStatus {
    if !challenge.is_active {
        ChallengeStatus::Inactive
    } else if is_completed {
        ChallengeStatus::Completed
    } else if today < challenge.start_date {
        ChallengeStatus::Upcoming
    } else if today > challenge.end_date {
        ChallengeStatus::Expired
    } else {
        ChallengeStatus::Active
    }
}
