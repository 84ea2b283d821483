use crate::domain::pipeline::Stage;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised when quota settings cross into the engine
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must hold 12 monthly values, got {len}")]
    InvalidTargetLength { field: &'static str, len: usize },

    #[error("{field} tier list is empty")]
    EmptyTiers { field: &'static str },

    #[error("{field} tiers are not sorted: {threshold} follows {previous}")]
    UnsortedTiers {
        field: &'static str,
        previous: Decimal,
        threshold: Decimal,
    },

    #[error("{field} tier threshold {threshold} is negative")]
    NegativeThreshold { field: &'static str, threshold: Decimal },

    #[error("Cannot combine settings for {found} into a {expected} view")]
    YearMismatch { expected: i32, found: i32 },
}

/// Errors related to opportunity stage changes
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },
}

/// Errors surfaced by the analytics service
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
