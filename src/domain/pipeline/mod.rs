// Pipeline domain
pub mod forecast;
pub mod opportunity;

pub use opportunity::{Opportunity, Stage, StageChange};
