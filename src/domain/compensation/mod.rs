// Compensation domain
pub mod calculator;
pub mod period;
pub mod tier;
