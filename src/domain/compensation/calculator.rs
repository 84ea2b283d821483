use super::period::{PeriodTotals, aggregate};
use super::tier::resolve_tier;
use crate::domain::errors::SettingsError;
use crate::domain::primitives::{MONTHS_PER_YEAR, ratio};
use crate::domain::sales::{MonthlyTargets, QuotaSettings, SalesEvent, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How terminal equipment turns into M0 provision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalProvisionPolicy {
    /// `terminals × terminal_bonus`
    #[default]
    PerUnitBonus,
    /// `terminal_base` per unit while the month's subscription target is unmet,
    /// `terminal_bonus` per unit once it is met
    TargetGatedBase,
}

impl FromStr for TerminalProvisionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per_unit_bonus" => Ok(TerminalProvisionPolicy::PerUnitBonus),
            "target_gated_base" => Ok(TerminalProvisionPolicy::TargetGatedBase),
            _ => anyhow::bail!(
                "Invalid terminal policy: {}. Must be 'per_unit_bonus' or 'target_gated_base'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionPolicy {
    pub terminal_policy: TerminalProvisionPolicy,
}

/// Actual/target figures and provisions for any span of months.
///
/// For a single user's single month the rates are the resolved tier rates.
/// For summed figures (whole year, combined team) rates are effective rates:
/// provision divided by the commissionable amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompensationFigures {
    pub subs_actual: Decimal,
    pub subs_target: Decimal,
    pub subs_achievement: Decimal,
    pub pay_actual: Decimal,
    pub pay_target: Decimal,
    pub pay_achievement: Decimal,
    pub commissionable_subs: Decimal,
    pub commissionable_pay: Decimal,

    pub go_lives: u32,
    pub go_live_target: u32,
    pub go_live_achievement: Decimal,
    pub terminals: u32,
    pub commissionable_terminals: u32,
    pub premium_go_lives: u32,

    pub subs_rate: Decimal,
    pub pay_rate: Decimal,
    pub subs_tier: Option<String>,
    pub pay_tier: Option<String>,

    // M0: paid in the go-live month
    pub subs_provision: Decimal,
    pub terminal_provision: Decimal,
    pub m0_provision: Decimal,
    // M3: payment based, paid three months later
    pub m3_provision: Decimal,
    pub total_provision: Decimal,
}

impl CompensationFigures {
    fn from_totals(totals: &PeriodTotals) -> Self {
        Self {
            subs_actual: totals.actual_subs,
            subs_target: totals.target_subs,
            subs_achievement: totals.subs_achievement(),
            pay_actual: totals.actual_pay,
            pay_target: totals.target_pay,
            pay_achievement: totals.pay_achievement(),
            commissionable_subs: totals.commissionable_subs,
            commissionable_pay: totals.commissionable_pay,
            go_lives: totals.go_lives,
            go_live_target: totals.target_go_lives,
            go_live_achievement: totals.go_live_achievement(),
            terminals: totals.terminals,
            commissionable_terminals: totals.commissionable_terminals,
            premium_go_lives: totals.premium_go_lives,
            ..Self::default()
        }
    }

    /// Field-wise sum. Achievement ratios and rates are recomputed from the
    /// summed amounts, never averaged.
    pub fn sum<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a CompensationFigures>,
    {
        let mut acc = Self::default();
        for part in parts {
            acc.subs_actual += part.subs_actual;
            acc.subs_target += part.subs_target;
            acc.pay_actual += part.pay_actual;
            acc.pay_target += part.pay_target;
            acc.commissionable_subs += part.commissionable_subs;
            acc.commissionable_pay += part.commissionable_pay;
            acc.go_lives += part.go_lives;
            acc.go_live_target += part.go_live_target;
            acc.terminals += part.terminals;
            acc.commissionable_terminals += part.commissionable_terminals;
            acc.premium_go_lives += part.premium_go_lives;
            acc.subs_provision += part.subs_provision;
            acc.terminal_provision += part.terminal_provision;
            acc.m0_provision += part.m0_provision;
            acc.m3_provision += part.m3_provision;
            acc.total_provision += part.total_provision;
        }
        acc.refresh_ratios();
        acc.refresh_effective_rates();
        acc
    }

    fn refresh_ratios(&mut self) {
        self.subs_achievement = ratio(self.subs_actual, self.subs_target);
        self.pay_achievement = ratio(self.pay_actual, self.pay_target);
        self.go_live_achievement = ratio(
            Decimal::from(self.go_lives),
            Decimal::from(self.go_live_target),
        );
    }

    fn refresh_effective_rates(&mut self) {
        self.subs_rate = ratio(self.subs_provision, self.commissionable_subs);
        self.pay_rate = ratio(self.m3_provision, self.commissionable_pay);
        self.subs_tier = None;
        self.pay_tier = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyResult {
    pub month: u32,
    #[serde(flatten)]
    pub figures: CompensationFigures,
}

/// Months `1..=through_month` of one year plus their totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationSummary {
    /// `None` for combined views
    pub user_id: Option<UserId>,
    pub year: i32,
    pub through_month: u32,
    pub months: Vec<MonthlyResult>,
    pub totals: CompensationFigures,
}

pub type YearSummary = CompensationSummary;
pub type YtdSummary = CompensationSummary;

impl CompensationSummary {
    fn from_months(user_id: Option<UserId>, year: i32, months: Vec<MonthlyResult>) -> Self {
        let totals = CompensationFigures::sum(months.iter().map(|m| &m.figures));
        Self {
            user_id,
            year,
            through_month: months.len() as u32,
            months,
            totals,
        }
    }

    /// Field-by-field sum of several users' summaries for the same year.
    pub fn combine(year: i32, summaries: &[CompensationSummary]) -> Self {
        let through_month = summaries
            .iter()
            .map(|s| s.through_month)
            .max()
            .unwrap_or(0);

        let months = (1..=through_month)
            .map(|month| MonthlyResult {
                month,
                figures: CompensationFigures::sum(
                    summaries
                        .iter()
                        .filter_map(|s| s.month(month))
                        .map(|m| &m.figures),
                ),
            })
            .collect();
        Self::from_months(None, year, months)
    }

    pub fn month(&self, month: u32) -> Option<&MonthlyResult> {
        self.months.iter().find(|m| m.month == month)
    }
}

/// One user's settings and sales events, as fed into the combined view.
#[derive(Debug, Clone, Copy)]
pub struct UserBook<'a> {
    pub settings: &'a QuotaSettings,
    pub events: &'a [SalesEvent],
}

/// Turns sales events and quota settings into monthly, YTD and yearly
/// compensation figures.
#[derive(Debug, Clone, Default)]
pub struct CommissionCalculator {
    policy: CommissionPolicy,
}

impl CommissionCalculator {
    pub fn new(policy: CommissionPolicy) -> Self {
        Self { policy }
    }

    pub fn monthly_result(
        &self,
        month: u32,
        events: &[SalesEvent],
        settings: &QuotaSettings,
    ) -> MonthlyResult {
        let totals = aggregate(events, &[month], &settings.targets);
        let mut figures = CompensationFigures::from_totals(&totals);

        let subs_tier = resolve_tier(&settings.subs_tiers, figures.subs_achievement);
        let pay_tier = resolve_tier(&settings.pay_tiers, figures.pay_achievement);
        figures.subs_rate = subs_tier.map(|t| t.rate).unwrap_or(Decimal::ZERO);
        figures.pay_rate = pay_tier.map(|t| t.rate).unwrap_or(Decimal::ZERO);
        figures.subs_tier = subs_tier.map(|t| t.label.clone());
        figures.pay_tier = pay_tier.map(|t| t.label.clone());

        figures.subs_provision = totals.commissionable_subs * figures.subs_rate;
        figures.terminal_provision = self.terminal_provision(&totals, settings);
        figures.m0_provision = figures.subs_provision + figures.terminal_provision;
        figures.m3_provision = totals.commissionable_pay * figures.pay_rate;
        figures.total_provision = figures.m0_provision + figures.m3_provision;

        MonthlyResult { month, figures }
    }

    pub fn year_summary(&self, events: &[SalesEvent], settings: &QuotaSettings) -> YearSummary {
        self.summary_through(events, settings, MONTHS_PER_YEAR)
    }

    /// Summary over months `1..=current_month`; `0` yields an empty, zero-valued summary.
    pub fn ytd_summary(
        &self,
        events: &[SalesEvent],
        settings: &QuotaSettings,
        current_month: u32,
    ) -> YtdSummary {
        self.summary_through(events, settings, current_month.min(MONTHS_PER_YEAR))
    }

    fn summary_through(
        &self,
        events: &[SalesEvent],
        settings: &QuotaSettings,
        through_month: u32,
    ) -> CompensationSummary {
        let months = (1..=through_month)
            .map(|month| self.monthly_result(month, events, settings))
            .collect();
        let summary = CompensationSummary::from_months(Some(settings.user_id), settings.year(), months);

        tracing::debug!(
            "Compensation {} {}/{}: subs {} of {} ({} achieved), provision {}",
            settings.user_id,
            summary.through_month,
            summary.year,
            summary.totals.subs_actual,
            summary.totals.subs_target,
            summary.totals.subs_achievement,
            summary.totals.total_provision
        );
        summary
    }

    /// GESAMT view over several users.
    ///
    /// Actuals and targets come from a single pass over all events against the
    /// element-wise summed targets; provisions are each user's own provisions
    /// (tier plans are personal) summed per month.
    pub fn combined_summary(
        &self,
        year: i32,
        books: &[UserBook<'_>],
        through_month: u32,
    ) -> Result<CompensationSummary, SettingsError> {
        let targets: MonthlyTargets =
            MonthlyTargets::combine(year, books.iter().map(|b| &b.settings.targets))?;
        let through_month = through_month.min(MONTHS_PER_YEAR);

        let individual: Vec<CompensationSummary> = books
            .iter()
            .map(|b| self.summary_through(b.events, b.settings, through_month))
            .collect();

        let months = (1..=through_month)
            .map(|month| {
                let totals = aggregate(books.iter().flat_map(|b| b.events.iter()), &[month], &targets);
                let mut figures = CompensationFigures::from_totals(&totals);
                for summary in &individual {
                    if let Some(own) = summary.month(month) {
                        figures.subs_provision += own.figures.subs_provision;
                        figures.terminal_provision += own.figures.terminal_provision;
                        figures.m0_provision += own.figures.m0_provision;
                        figures.m3_provision += own.figures.m3_provision;
                        figures.total_provision += own.figures.total_provision;
                    }
                }
                figures.refresh_effective_rates();
                MonthlyResult { month, figures }
            })
            .collect();

        Ok(CompensationSummary::from_months(None, year, months))
    }

    fn terminal_provision(&self, totals: &PeriodTotals, settings: &QuotaSettings) -> Decimal {
        let units = Decimal::from(totals.commissionable_terminals);
        match self.policy.terminal_policy {
            TerminalProvisionPolicy::PerUnitBonus => units * settings.terminal_bonus,
            TerminalProvisionPolicy::TargetGatedBase => {
                if totals.subs_achievement() >= Decimal::ONE {
                    units * settings.terminal_bonus
                } else {
                    units * settings.terminal_base
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sales::CommissionTier;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn settings(user: u128) -> QuotaSettings {
        let mut targets = MonthlyTargets::zero(2025);
        targets.subs = [dec!(1000); 12];
        targets.pay = [dec!(400); 12];
        targets.go_lives = [2; 12];
        QuotaSettings {
            user_id: Uuid::from_u128(user),
            targets,
            subs_tiers: vec![
                CommissionTier::new(dec!(0), "Base", dec!(0.05)),
                CommissionTier::new(dec!(1.0), "Target", dec!(0.10)),
            ],
            pay_tiers: vec![
                CommissionTier::new(dec!(0), "Base", dec!(0.02)),
                CommissionTier::new(dec!(1.0), "Target", dec!(0.04)),
            ],
            terminal_base: dec!(20),
            terminal_bonus: dec!(50),
        }
    }

    fn event(user: u128, month: u32, subs: Decimal, pay: Decimal, terminal: bool) -> SalesEvent {
        SalesEvent {
            user_id: Uuid::from_u128(user),
            month,
            year: 2025,
            subs_arr: subs,
            pay_arr: pay,
            has_terminal: terminal,
            commission_relevant: true,
            premium: false,
            go_live_date: None,
            created_at: Utc.with_ymd_and_hms(2025, month, 10, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_march_over_target() {
        let calculator = CommissionCalculator::default();
        let events = vec![
            event(1, 3, dec!(700), Decimal::ZERO, false),
            event(1, 3, dec!(500), Decimal::ZERO, false),
        ];
        let march = calculator.monthly_result(3, &events, &settings(1));

        assert_eq!(march.figures.subs_actual, dec!(1200));
        assert_eq!(march.figures.subs_target, dec!(1000));
        assert_eq!(march.figures.subs_achievement, dec!(1.2));
        assert_eq!(march.figures.subs_rate, dec!(0.10));
        assert_eq!(march.figures.subs_tier.as_deref(), Some("Target"));
        assert_eq!(march.figures.subs_provision, dec!(120));
        assert_eq!(march.figures.total_provision, dec!(120));
    }

    #[test]
    fn test_m0_m3_split_with_terminals() {
        let calculator = CommissionCalculator::default();
        let events = vec![
            event(1, 5, dec!(600), dec!(300), true),
            event(1, 5, dec!(200), dec!(200), true),
        ];
        let may = calculator.monthly_result(5, &events, &settings(1));

        // subs 800/1000 -> 5%, pay 500/400 -> 4%
        assert_eq!(may.figures.subs_provision, dec!(40));
        assert_eq!(may.figures.terminal_provision, dec!(100));
        assert_eq!(may.figures.m0_provision, dec!(140));
        assert_eq!(may.figures.m3_provision, dec!(20));
        assert_eq!(may.figures.total_provision, dec!(160));
    }

    #[test]
    fn test_target_gated_terminal_policy() {
        let calculator = CommissionCalculator::new(CommissionPolicy {
            terminal_policy: TerminalProvisionPolicy::TargetGatedBase,
        });
        let below = vec![event(1, 2, dec!(500), Decimal::ZERO, true)];
        let above = vec![event(1, 2, dec!(1500), Decimal::ZERO, true)];

        let s = settings(1);
        assert_eq!(calculator.monthly_result(2, &below, &s).figures.terminal_provision, dec!(20));
        assert_eq!(calculator.monthly_result(2, &above, &s).figures.terminal_provision, dec!(50));
    }

    #[test]
    fn test_non_commissionable_events_count_for_achievement_only() {
        let calculator = CommissionCalculator::default();
        let mut excluded = event(1, 4, dec!(800), dec!(100), true);
        excluded.commission_relevant = false;
        let events = vec![excluded, event(1, 4, dec!(400), Decimal::ZERO, false)];

        let april = calculator.monthly_result(4, &events, &settings(1));
        assert_eq!(april.figures.subs_achievement, dec!(1.2));
        assert_eq!(april.figures.subs_provision, dec!(40));
        assert_eq!(april.figures.terminal_provision, Decimal::ZERO);
        assert_eq!(april.figures.m3_provision, Decimal::ZERO);
    }

    #[test]
    fn test_year_ratio_from_sums_not_mean() {
        let calculator = CommissionCalculator::default();
        let mut s = settings(1);
        s.targets.subs = [Decimal::ZERO; 12];
        s.targets.subs[0] = dec!(1000);
        let events = vec![
            event(1, 1, dec!(500), Decimal::ZERO, false),
            event(1, 2, dec!(500), Decimal::ZERO, false),
        ];

        let year = calculator.year_summary(&events, &s);
        assert_eq!(year.months.len(), 12);
        assert_eq!(year.months[1].figures.subs_achievement, Decimal::ZERO);
        assert_eq!(year.totals.subs_achievement, dec!(1.0));
    }

    #[test]
    fn test_ytd_is_prefix_of_year() {
        let calculator = CommissionCalculator::default();
        let events: Vec<SalesEvent> = (1..=12)
            .map(|m| event(1, m, Decimal::from(m * 150), dec!(100), m % 3 == 0))
            .collect();
        let s = settings(1);

        let year = calculator.year_summary(&events, &s);
        let ytd = calculator.ytd_summary(&events, &s, 7);
        assert_eq!(ytd.through_month, 7);
        assert_eq!(ytd.months[..], year.months[..7]);
        assert_eq!(
            ytd.totals,
            CompensationFigures::sum(year.months[..7].iter().map(|m| &m.figures))
        );
    }

    #[test]
    fn test_empty_inputs_give_zero_summary() {
        let calculator = CommissionCalculator::default();
        let s = QuotaSettings::unconfigured(Uuid::from_u128(9), 2025);
        let year = calculator.year_summary(&[], &s);

        assert_eq!(year.months.len(), 12);
        assert_eq!(year.totals, CompensationFigures::default());

        let ytd = calculator.ytd_summary(&[], &s, 0);
        assert!(ytd.months.is_empty());
        assert_eq!(ytd.totals.total_provision, Decimal::ZERO);
    }

    #[test]
    fn test_combined_matches_sum_of_individuals() {
        let calculator = CommissionCalculator::default();
        let (s1, s2) = (settings(1), settings(2));
        let e1 = vec![
            event(1, 1, dec!(1500), dec!(100), true),
            event(1, 6, dec!(300), dec!(500), false),
        ];
        let e2 = vec![event(2, 1, dec!(200), dec!(50), false)];

        let combined = calculator
            .combined_summary(
                2025,
                &[
                    UserBook { settings: &s1, events: &e1 },
                    UserBook { settings: &s2, events: &e2 },
                ],
                12,
            )
            .unwrap();
        let summed = CompensationSummary::combine(
            2025,
            &[calculator.year_summary(&e1, &s1), calculator.year_summary(&e2, &s2)],
        );

        assert_eq!(combined, summed);
        assert_eq!(combined.months[0].figures.subs_target, dec!(2000));
        assert_eq!(combined.months[0].figures.subs_actual, dec!(1700));
        // user 1 at 150% (10%) + user 2 at 20% (5%)
        assert_eq!(combined.months[0].figures.subs_provision, dec!(160));
    }

    #[test]
    fn test_combined_rejects_mixed_years() {
        let calculator = CommissionCalculator::default();
        let s1 = settings(1);
        let mut s2 = settings(2);
        s2.targets.year = 2024;

        let result = calculator.combined_summary(
            2025,
            &[
                UserBook { settings: &s1, events: &[] },
                UserBook { settings: &s2, events: &[] },
            ],
            12,
        );
        assert!(matches!(result, Err(SettingsError::YearMismatch { found: 2024, .. })));
    }

    #[test]
    fn test_terminal_policy_from_str() {
        assert_eq!(
            "TARGET_GATED_BASE".parse::<TerminalProvisionPolicy>().unwrap(),
            TerminalProvisionPolicy::TargetGatedBase
        );
        assert!("flat".parse::<TerminalProvisionPolicy>().is_err());
    }
}
