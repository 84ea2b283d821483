// Role capabilities and aggregation scope
pub mod access;

// Tiered commission domain
pub mod compensation;

// Domain-specific error types
pub mod errors;

// Challenges, streaks, badges and reward points
pub mod gamification;

// Sales pipeline and forecasting
pub mod pipeline;

// Shared ratio/ARR/date helpers
pub mod primitives;

// Sales facts and quota settings
pub mod sales;
