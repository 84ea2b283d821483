use super::streak::{StreakPolicy, StreakTracker, daily_go_lives};
use crate::domain::compensation::calculator::CompensationSummary;
use crate::domain::sales::SalesEvent;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeRarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Rule a user's full history must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum BadgeCriterion {
    GoLives(u32),
    Terminals(u32),
    PremiumGoLives(u32),
    /// Months whose subscription target was met (months without target don't count)
    MonthsOnTarget(u32),
    /// Consecutive days with at least one go-live
    GoLiveStreak(u32),
    ChallengesCompleted(u32),
    SubsArrTotal(Decimal),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub rarity: BadgeRarity,
    pub criterion: BadgeCriterion,
}

impl BadgeDefinition {
    fn new(id: &str, name: &str, icon: &str, rarity: BadgeRarity, criterion: BadgeCriterion) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            rarity,
            criterion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub badge_id: String,
    pub name: String,
    pub icon: String,
    pub rarity: BadgeRarity,
    /// Day the rule was first satisfied, when it can be dated
    pub earned_on: Option<NaiveDate>,
}

/// Everything badge rules look at for one user
#[derive(Debug, Clone, Copy)]
pub struct BadgeHistory<'a> {
    pub events: &'a [SalesEvent],
    pub summaries: &'a [CompensationSummary],
    pub completed_challenges: usize,
}

pub fn default_catalogue() -> Vec<BadgeDefinition> {
    use BadgeCriterion::*;
    use BadgeRarity::*;

    vec![
        BadgeDefinition::new("first_go_live", "First Go-Live", "🚀", Common, GoLives(1)),
        BadgeDefinition::new("ten_go_lives", "Ten Go-Lives", "🔟", Rare, GoLives(10)),
        BadgeDefinition::new("fifty_go_lives", "Fifty Go-Lives", "🏅", Epic, GoLives(50)),
        BadgeDefinition::new("terminal_pro", "Terminal Pro", "💳", Rare, Terminals(10)),
        BadgeDefinition::new("premium_seller", "Premium Seller", "💎", Rare, PremiumGoLives(5)),
        BadgeDefinition::new("target_hit", "On Target", "🎯", Common, MonthsOnTarget(1)),
        BadgeDefinition::new("hat_trick", "Hat Trick", "🎩", Epic, MonthsOnTarget(3)),
        BadgeDefinition::new("on_fire", "On Fire", "🔥", Epic, GoLiveStreak(5)),
        BadgeDefinition::new("challenger", "Challenger", "⚔️", Rare, ChallengesCompleted(1)),
        BadgeDefinition::new("champion", "Champion", "🏆", Legendary, ChallengesCompleted(5)),
        BadgeDefinition::new(
            "six_figures",
            "Six Figures",
            "👑",
            Legendary,
            SubsArrTotal(Decimal::from(100_000)),
        ),
    ]
}

/// Evaluates badge rules over a user's full history.
#[derive(Debug, Clone)]
pub struct BadgeEvaluator {
    catalogue: Vec<BadgeDefinition>,
    streak_policy: StreakPolicy,
}

impl Default for BadgeEvaluator {
    fn default() -> Self {
        Self::new(default_catalogue(), StreakPolicy::default())
    }
}

impl BadgeEvaluator {
    pub fn new(catalogue: Vec<BadgeDefinition>, streak_policy: StreakPolicy) -> Self {
        Self {
            catalogue,
            streak_policy,
        }
    }

    /// Badges earned, in catalogue order.
    pub fn evaluate(&self, history: &BadgeHistory<'_>) -> Vec<EarnedBadge> {
        let mut dates: Vec<NaiveDate> = history.events.iter().map(|e| e.activity_date()).collect();
        dates.sort();

        self.catalogue
            .iter()
            .filter_map(|badge| {
                let earned_on = match &badge.criterion {
                    BadgeCriterion::GoLives(n) => nth(&dates, *n)?,
                    BadgeCriterion::Terminals(n) => {
                        nth(&sorted_dates(history.events, |e| e.has_terminal), *n)?
                    }
                    BadgeCriterion::PremiumGoLives(n) => {
                        nth(&sorted_dates(history.events, |e| e.premium), *n)?
                    }
                    BadgeCriterion::MonthsOnTarget(n) => months_on_target(history.summaries, *n)?,
                    BadgeCriterion::GoLiveStreak(n) => self.streak_reached(history.events, &dates, *n)?,
                    BadgeCriterion::ChallengesCompleted(n) => {
                        (history.completed_challenges >= *n as usize).then_some(None)?
                    }
                    BadgeCriterion::SubsArrTotal(amount) => subs_total_reached(history.events, *amount)?,
                };

                Some(EarnedBadge {
                    badge_id: badge.id.clone(),
                    name: badge.name.clone(),
                    icon: badge.icon.clone(),
                    rarity: badge.rarity,
                    earned_on,
                })
            })
            .collect()
    }

    /// Day on which a run of `n` consecutive go-live days was first completed.
    fn streak_reached(
        &self,
        events: &[SalesEvent],
        dates: &[NaiveDate],
        n: u32,
    ) -> Option<Option<NaiveDate>> {
        let (first, last) = (*dates.first()?, *dates.last()?);
        let activity = daily_go_lives(events, first, last);
        let result = StreakTracker::new(1, self.streak_policy).compute(&activity);
        if result.best_streak < n {
            return None;
        }

        let mut run = 0;
        for (day, success) in activity.iter().zip(&result.day_flags) {
            run = if *success { run + 1 } else { 0 };
            if run >= n {
                return Some(Some(day.date));
            }
        }
        None
    }
}

/// `Some(date of the n-th entry)` when there are at least `n` entries.
fn nth(sorted: &[NaiveDate], n: u32) -> Option<Option<NaiveDate>> {
    let idx = (n as usize).checked_sub(1)?;
    sorted.get(idx).map(|date| Some(*date))
}

fn sorted_dates(events: &[SalesEvent], keep: impl Fn(&SalesEvent) -> bool) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = events
        .iter()
        .filter(|e| keep(*e))
        .map(|e| e.activity_date())
        .collect();
    dates.sort();
    dates
}

fn months_on_target(summaries: &[CompensationSummary], n: u32) -> Option<Option<NaiveDate>> {
    let mut hits: Vec<(i32, u32)> = summaries
        .iter()
        .flat_map(|summary| {
            summary
                .months
                .iter()
                .filter(|m| {
                    m.figures.subs_target > Decimal::ZERO
                        && m.figures.subs_achievement >= Decimal::ONE
                })
                .map(move |m| (summary.year, m.month))
        })
        .collect();
    hits.sort();
    hits.dedup();

    let idx = (n as usize).checked_sub(1)?;
    hits.get(idx)
        .map(|(year, month)| NaiveDate::from_ymd_opt(*year, *month, 1))
}

fn subs_total_reached(events: &[SalesEvent], amount: Decimal) -> Option<Option<NaiveDate>> {
    let mut ordered: Vec<&SalesEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.activity_date());

    let mut running = Decimal::ZERO;
    for event in ordered {
        running += event.subs_arr;
        if running >= amount {
            return Some(Some(event.activity_date()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compensation::calculator::CommissionCalculator;
    use crate::domain::sales::QuotaSettings;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn go_live(month: u32, day: u32, subs: Decimal, terminal: bool) -> SalesEvent {
        SalesEvent {
            user_id: Uuid::from_u128(1),
            month,
            year: 2025,
            subs_arr: subs,
            pay_arr: Decimal::ZERO,
            has_terminal: terminal,
            commission_relevant: true,
            premium: false,
            go_live_date: NaiveDate::from_ymd_opt(2025, month, day),
            created_at: Utc.with_ymd_and_hms(2025, month, day, 9, 0, 0).unwrap(),
        }
    }

    fn ids(badges: &[EarnedBadge]) -> Vec<&str> {
        badges.iter().map(|b| b.badge_id.as_str()).collect()
    }

    #[test]
    fn test_no_history_no_badges() {
        let history = BadgeHistory {
            events: &[],
            summaries: &[],
            completed_challenges: 0,
        };
        assert!(BadgeEvaluator::default().evaluate(&history).is_empty());
    }

    #[test]
    fn test_first_go_live_dated() {
        let events = vec![go_live(4, 9, dec!(100), false), go_live(2, 3, dec!(100), false)];
        let history = BadgeHistory {
            events: &events,
            summaries: &[],
            completed_challenges: 0,
        };
        let badges = BadgeEvaluator::default().evaluate(&history);

        assert_eq!(ids(&badges), vec!["first_go_live"]);
        assert_eq!(badges[0].earned_on, NaiveDate::from_ymd_opt(2025, 2, 3));
    }

    #[test]
    fn test_streak_badge_earned_on_fifth_day() {
        let events: Vec<SalesEvent> = (10..=15).map(|d| go_live(3, d, dec!(50), false)).collect();
        let history = BadgeHistory {
            events: &events,
            summaries: &[],
            completed_challenges: 0,
        };
        let badges = BadgeEvaluator::default().evaluate(&history);
        let on_fire = badges.iter().find(|b| b.badge_id == "on_fire").unwrap();

        assert_eq!(on_fire.earned_on, NaiveDate::from_ymd_opt(2025, 3, 14));
        assert_eq!(on_fire.rarity, BadgeRarity::Epic);
    }

    #[test]
    fn test_months_on_target_from_summaries() {
        let mut settings = QuotaSettings::unconfigured(Uuid::from_u128(1), 2025);
        settings.targets.subs[0] = dec!(100);
        settings.targets.subs[1] = dec!(100);
        let events = vec![go_live(1, 5, dec!(150), false), go_live(2, 5, dec!(50), false)];
        let summary = CommissionCalculator::default().year_summary(&events, &settings);

        let history = BadgeHistory {
            events: &events,
            summaries: std::slice::from_ref(&summary),
            completed_challenges: 1,
        };
        let badges = BadgeEvaluator::default().evaluate(&history);

        assert_eq!(ids(&badges), vec!["first_go_live", "target_hit", "challenger"]);
        assert_eq!(badges[1].earned_on, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(badges[2].earned_on, None);
    }

    #[test]
    fn test_subs_total_and_terminal_counts() {
        let mut events: Vec<SalesEvent> =
            (1..=10).map(|d| go_live(5, d * 2, dec!(9000), true)).collect();
        events.push(go_live(6, 1, dec!(20000), false));
        let history = BadgeHistory {
            events: &events,
            summaries: &[],
            completed_challenges: 0,
        };
        let badges = BadgeEvaluator::default().evaluate(&history);

        let terminal_pro = badges.iter().find(|b| b.badge_id == "terminal_pro").unwrap();
        assert_eq!(terminal_pro.earned_on, NaiveDate::from_ymd_opt(2025, 5, 20));
        let six_figures = badges.iter().find(|b| b.badge_id == "six_figures").unwrap();
        assert_eq!(six_figures.earned_on, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert!(badges.iter().any(|b| b.badge_id == "ten_go_lives"));
        assert!(!badges.iter().any(|b| b.badge_id == "on_fire"));
    }
}
