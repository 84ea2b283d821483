use crate::domain::primitives::{MONTHS_PER_YEAR, is_valid_month, ratio};
use crate::domain::sales::{MonthlyTargets, SalesEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Calendar window inside one quota year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Period {
    Month(u32),
    Quarter(u32),     // 1-4
    YearToDate(u32),  // through this month
    FullYear,
}

impl Period {
    /// Months covered by this period, ascending. Out-of-range inputs give an empty set.
    pub fn months(&self) -> Vec<u32> {
        match *self {
            Period::Month(month) if is_valid_month(month) => vec![month],
            Period::Quarter(quarter) if (1..=4).contains(&quarter) => {
                let first = (quarter - 1) * 3 + 1;
                (first..first + 3).collect()
            }
            Period::YearToDate(month) => (1..=month.min(MONTHS_PER_YEAR)).collect(),
            Period::FullYear => (1..=MONTHS_PER_YEAR).collect(),
            _ => Vec::new(),
        }
    }
}

/// Actual vs. target sums over a set of months
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub actual_subs: Decimal,
    pub actual_pay: Decimal,
    /// Subset of the actuals flagged as commission relevant
    pub commissionable_subs: Decimal,
    pub commissionable_pay: Decimal,
    pub go_lives: u32,
    pub terminals: u32,
    pub commissionable_terminals: u32,
    pub premium_go_lives: u32,
    pub target_subs: Decimal,
    pub target_pay: Decimal,
    pub target_go_lives: u32,
}

impl PeriodTotals {
    pub fn subs_achievement(&self) -> Decimal {
        ratio(self.actual_subs, self.target_subs)
    }

    pub fn pay_achievement(&self) -> Decimal {
        ratio(self.actual_pay, self.target_pay)
    }

    pub fn go_live_achievement(&self) -> Decimal {
        ratio(
            Decimal::from(self.go_lives),
            Decimal::from(self.target_go_lives),
        )
    }
}

/// Sum events and targets over `months` of the targets' year.
///
/// Duplicate months count once; months outside 1-12 and events from other
/// years are ignored.
pub fn aggregate<'a, I>(events: I, months: &[u32], targets: &MonthlyTargets) -> PeriodTotals
where
    I: IntoIterator<Item = &'a SalesEvent>,
{
    let months: BTreeSet<u32> = months.iter().copied().filter(|m| is_valid_month(*m)).collect();
    let mut totals = PeriodTotals::default();

    for &month in &months {
        let idx = (month - 1) as usize;
        totals.target_subs += targets.subs[idx];
        totals.target_pay += targets.pay[idx];
        totals.target_go_lives += targets.go_lives[idx];
    }

    for event in events
        .into_iter()
        .filter(|e| e.year == targets.year && months.contains(&e.month))
    {
        totals.actual_subs += event.subs_arr;
        totals.actual_pay += event.pay_arr;
        totals.go_lives += 1;
        if event.has_terminal {
            totals.terminals += 1;
        }
        if event.premium {
            totals.premium_go_lives += 1;
        }
        if event.commission_relevant {
            totals.commissionable_subs += event.subs_arr;
            totals.commissionable_pay += event.pay_arr;
            if event.has_terminal {
                totals.commissionable_terminals += 1;
            }
        }
    }

    totals
}

pub fn aggregate_period<'a, I>(events: I, period: Period, targets: &MonthlyTargets) -> PeriodTotals
where
    I: IntoIterator<Item = &'a SalesEvent>,
{
    aggregate(events, &period.months(), targets)
}
