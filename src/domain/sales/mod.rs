pub mod event;
pub mod quota;

pub use event::{SalesEvent, UserId};
pub use quota::{CommissionTier, MonthlyTargets, QuotaSettings, RawQuotaSettings};
