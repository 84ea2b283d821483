use crate::domain::sales::SalesEvent;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Where the trailing ("current") streak is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakAnchor {
    /// Ends at the last day carrying any activity. A quiet evaluation day does
    /// not break the streak until activity resumes.
    #[default]
    LastActivityDay,
    /// Ends at the last day of the window. A day without qualifying activity
    /// resets the streak, including the evaluation day itself.
    EvaluationDay,
}

impl FromStr for StreakAnchor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last_activity_day" => Ok(StreakAnchor::LastActivityDay),
            "evaluation_day" => Ok(StreakAnchor::EvaluationDay),
            _ => anyhow::bail!(
                "Invalid streak anchor: {}. Must be 'last_activity_day' or 'evaluation_day'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakPolicy {
    pub anchor: StreakAnchor,
}

/// Qualifying activity count for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakResult {
    pub current_streak: u32,
    pub best_streak: u32,
    /// One flag per day of the window, for calendar rendering
    pub day_flags: Vec<bool>,
}

/// Finds runs of consecutive qualifying days.
#[derive(Debug, Clone, Copy)]
pub struct StreakTracker {
    min_per_day: u32,
    policy: StreakPolicy,
}

impl StreakTracker {
    /// A minimum of zero is treated as one so that empty days never qualify.
    pub fn new(min_per_day: u32, policy: StreakPolicy) -> Self {
        Self {
            min_per_day: min_per_day.max(1),
            policy,
        }
    }

    /// `activity` must hold one entry per calendar day, in order.
    pub fn compute(&self, activity: &[DailyActivity]) -> StreakResult {
        let day_flags: Vec<bool> = activity
            .iter()
            .map(|day| day.count >= self.min_per_day)
            .collect();

        let mut best_streak = 0;
        let mut run = 0;
        for &success in &day_flags {
            run = if success { run + 1 } else { 0 };
            best_streak = best_streak.max(run);
        }

        let anchor = match self.policy.anchor {
            StreakAnchor::LastActivityDay => activity.iter().rposition(|day| day.count > 0),
            StreakAnchor::EvaluationDay => day_flags.len().checked_sub(1),
        };
        let current_streak = anchor
            .map(|end| {
                day_flags[..=end]
                    .iter()
                    .rev()
                    .take_while(|success| **success)
                    .count() as u32
            })
            .unwrap_or(0);

        StreakResult {
            current_streak,
            best_streak,
            day_flags,
        }
    }
}

/// Dense per-day go-live counts over the inclusive window.
pub fn daily_go_lives<'a, I>(events: I, start: NaiveDate, end: NaiveDate) -> Vec<DailyActivity>
where
    I: IntoIterator<Item = &'a SalesEvent>,
{
    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for event in events.into_iter().filter(|e| e.is_within(start, end)) {
        *counts.entry(event.activity_date()).or_insert(0) += 1;
    }

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|date| DailyActivity {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}
