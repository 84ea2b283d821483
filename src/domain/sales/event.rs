use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// A recorded go-live: one customer activation attributed to a user and month.
///
/// The engine only ever reads these; edits happen in the entry form or import
/// layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesEvent {
    pub user_id: UserId,
    pub month: u32, // 1-12
    pub year: i32,
    pub subs_arr: Decimal,
    #[serde(default)]
    pub pay_arr: Decimal,
    #[serde(default)]
    pub has_terminal: bool,
    #[serde(default = "default_commission_relevant")]
    pub commission_relevant: bool,
    #[serde(default)]
    pub premium: bool,
    /// Activation day; `created_at` is used when absent
    #[serde(default)]
    pub go_live_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

fn default_commission_relevant() -> bool {
    true
}

impl SalesEvent {
    /// Day the event counts for in date-windowed views (challenges, streaks).
    pub fn activity_date(&self) -> NaiveDate {
        self.go_live_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }

    pub fn total_arr(&self) -> Decimal {
        self.subs_arr + self.pay_arr
    }

    pub fn is_within(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let date = self.activity_date();
        start <= date && date <= end
    }
}
