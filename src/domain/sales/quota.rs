//! Quota settings value objects
//!
//! `QuotaSettings` is what the calculators consume. It can only be built from
//! a `RawQuotaSettings` (the settings editor's shape) through `TryFrom`, which
//! is where tier ordering and target array lengths are checked. Once inside
//! the engine the settings are trusted.

use crate::domain::errors::SettingsError;
use crate::domain::primitives::MONTHS_PER_YEAR;
use crate::domain::sales::event::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const MONTHS: usize = MONTHS_PER_YEAR as usize;

/// One commission band: from `threshold` (achievement ratio) upward, pay `rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionTier {
    pub threshold: Decimal, // e.g. 1.0 = 100% of target
    pub label: String,
    pub rate: Decimal, // e.g. 0.10 = 10%
}

impl CommissionTier {
    pub fn new(threshold: Decimal, label: impl Into<String>, rate: Decimal) -> Self {
        Self {
            threshold,
            label: label.into(),
            rate,
        }
    }
}

/// Per-month targets for one year, indexed by `month - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTargets {
    pub year: i32,
    pub subs: [Decimal; MONTHS],
    pub pay: [Decimal; MONTHS],
    pub go_lives: [u32; MONTHS],
}

impl MonthlyTargets {
    pub fn zero(year: i32) -> Self {
        Self {
            year,
            subs: [Decimal::ZERO; MONTHS],
            pay: [Decimal::ZERO; MONTHS],
            go_lives: [0; MONTHS],
        }
    }

    /// Element-wise sum across users, all of which must belong to `year`.
    pub fn combine<'a, I>(year: i32, parts: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = &'a MonthlyTargets>,
    {
        let mut combined = Self::zero(year);
        for part in parts {
            if part.year != year {
                return Err(SettingsError::YearMismatch {
                    expected: year,
                    found: part.year,
                });
            }
            for i in 0..MONTHS {
                combined.subs[i] += part.subs[i];
                combined.pay[i] += part.pay[i];
                combined.go_lives[i] += part.go_lives[i];
            }
        }
        Ok(combined)
    }
}

/// Validated quota and commission configuration for one user and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQuotaSettings", into = "RawQuotaSettings")]
pub struct QuotaSettings {
    pub user_id: UserId,
    pub targets: MonthlyTargets,
    pub subs_tiers: Vec<CommissionTier>,
    pub pay_tiers: Vec<CommissionTier>,
    pub terminal_base: Decimal,
    pub terminal_bonus: Decimal,
}

impl QuotaSettings {
    /// Settings for a user nobody has configured yet: zero targets, no tiers.
    pub fn unconfigured(user_id: UserId, year: i32) -> Self {
        Self {
            user_id,
            targets: MonthlyTargets::zero(year),
            subs_tiers: Vec::new(),
            pay_tiers: Vec::new(),
            terminal_base: Decimal::ZERO,
            terminal_bonus: Decimal::ZERO,
        }
    }

    pub fn year(&self) -> i32 {
        self.targets.year
    }
}

/// Settings as the editor stores them, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuotaSettings {
    pub user_id: UserId,
    pub year: i32,
    pub monthly_subs_targets: Vec<Decimal>,
    pub monthly_pay_targets: Vec<Decimal>,
    pub monthly_go_live_targets: Vec<u32>,
    pub subs_tiers: Vec<CommissionTier>,
    pub pay_tiers: Vec<CommissionTier>,
    #[serde(default)]
    pub terminal_base: Decimal,
    #[serde(default)]
    pub terminal_bonus: Decimal,
}

impl TryFrom<RawQuotaSettings> for QuotaSettings {
    type Error = SettingsError;

    fn try_from(raw: RawQuotaSettings) -> Result<Self, Self::Error> {
        validate_tiers("subs_tiers", &raw.subs_tiers)?;
        validate_tiers("pay_tiers", &raw.pay_tiers)?;

        Ok(Self {
            user_id: raw.user_id,
            targets: MonthlyTargets {
                year: raw.year,
                subs: to_months("monthly_subs_targets", raw.monthly_subs_targets)?,
                pay: to_months("monthly_pay_targets", raw.monthly_pay_targets)?,
                go_lives: to_months("monthly_go_live_targets", raw.monthly_go_live_targets)?,
            },
            subs_tiers: raw.subs_tiers,
            pay_tiers: raw.pay_tiers,
            terminal_base: raw.terminal_base,
            terminal_bonus: raw.terminal_bonus,
        })
    }
}

impl From<QuotaSettings> for RawQuotaSettings {
    fn from(settings: QuotaSettings) -> Self {
        Self {
            user_id: settings.user_id,
            year: settings.targets.year,
            monthly_subs_targets: settings.targets.subs.to_vec(),
            monthly_pay_targets: settings.targets.pay.to_vec(),
            monthly_go_live_targets: settings.targets.go_lives.to_vec(),
            subs_tiers: settings.subs_tiers,
            pay_tiers: settings.pay_tiers,
            terminal_base: settings.terminal_base,
            terminal_bonus: settings.terminal_bonus,
        }
    }
}

fn to_months<T>(field: &'static str, values: Vec<T>) -> Result<[T; MONTHS], SettingsError> {
    let len = values.len();
    values
        .try_into()
        .map_err(|_| SettingsError::InvalidTargetLength { field, len })
}

fn validate_tiers(field: &'static str, tiers: &[CommissionTier]) -> Result<(), SettingsError> {
    let Some(first) = tiers.first() else {
        return Err(SettingsError::EmptyTiers { field });
    };
    if first.threshold < Decimal::ZERO {
        return Err(SettingsError::NegativeThreshold {
            field,
            threshold: first.threshold,
        });
    }

    for pair in tiers.windows(2) {
        if pair[1].threshold <= pair[0].threshold {
            return Err(SettingsError::UnsortedTiers {
                field,
                previous: pair[0].threshold,
                threshold: pair[1].threshold,
            });
        }
    }
    Ok(())
}
