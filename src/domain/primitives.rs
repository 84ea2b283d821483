use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;

/// Shared numeric and calendar helpers.
pub const MONTHS_PER_YEAR: u32 = 12;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// `numerator / denominator`, or zero when the denominator is zero.
///
/// Never yields NaN or Infinity; every achievement and conversion ratio in the
/// crate goes through here.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// Same as [`ratio`] scaled to a percentage.
pub fn percent(numerator: Decimal, denominator: Decimal) -> Decimal {
    ratio(numerator, denominator) * Decimal::ONE_HUNDRED
}

/// Annualised recurring revenue from a monthly amount.
pub fn annualize(monthly: Decimal) -> Decimal {
    monthly * Decimal::from(MONTHS_PER_YEAR)
}

pub fn is_valid_month(month: u32) -> bool {
    (1..=MONTHS_PER_YEAR).contains(&month)
}

/// Midnight UTC of the given day.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Fractional days from `from` to `to` (negative if `to` is earlier).
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Every (year, month) pair touched by the inclusive date range.
pub fn months_spanned(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    if end < start {
        return months;
    }

    let (mut year, mut month) = (start.year(), start.month());
    let last = (end.year(), end.month());
    while (year, month) <= last {
        months.push((year, month));
        if month == MONTHS_PER_YEAR {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}
