//! Shared fixtures for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use commission_analytics::domain::pipeline::{Opportunity, Stage};
use commission_analytics::domain::sales::{CommissionTier, MonthlyTargets, QuotaSettings, SalesEvent, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

pub const YEAR: i32 = 2025;

pub fn user(n: u128) -> UserId {
    Uuid::from_u128(n)
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(YEAR, month, day).unwrap()
}

pub fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(YEAR, month, day, hour, 0, 0).unwrap()
}

pub fn go_live(u: u128, month: u32, day: u32, subs: Decimal, pay: Decimal) -> SalesEvent {
    SalesEvent {
        user_id: user(u),
        month,
        year: YEAR,
        subs_arr: subs,
        pay_arr: pay,
        has_terminal: false,
        commission_relevant: true,
        premium: false,
        go_live_date: Some(date(month, day)),
        created_at: at(month, day, 10),
    }
}

/// 0% → 5%, 100% → 10%
pub fn two_band() -> Vec<CommissionTier> {
    vec![
        CommissionTier::new(dec!(0), "Base", dec!(0.05)),
        CommissionTier::new(dec!(1.0), "Target", dec!(0.10)),
    ]
}

pub fn settings(u: u128, monthly_subs_target: Decimal) -> QuotaSettings {
    let mut targets = MonthlyTargets::zero(YEAR);
    targets.subs = [monthly_subs_target; 12];
    targets.pay = [monthly_subs_target / dec!(2); 12];
    targets.go_lives = [2; 12];
    QuotaSettings {
        user_id: user(u),
        targets,
        subs_tiers: two_band(),
        pay_tiers: vec![
            CommissionTier::new(dec!(0), "Base", dec!(0.02)),
            CommissionTier::new(dec!(0.8), "Good", dec!(0.03)),
            CommissionTier::new(dec!(1.2), "Great", dec!(0.05)),
        ],
        terminal_base: dec!(25),
        terminal_bonus: dec!(50),
    }
}

pub fn deal(id: u128, stage: Stage, subs_monthly: Decimal) -> Opportunity {
    Opportunity {
        id: Uuid::from_u128(id),
        owner_id: user(1),
        name: format!("Merchant {id}"),
        stage,
        expected_subs_monthly: subs_monthly,
        expected_pay_monthly: Decimal::ZERO,
        probability: None,
        expected_close_date: None,
        actual_close_date: None,
        stage_changed_at: at(5, 1, 9),
        created_at: at(4, 1, 9),
        stage_history: Vec::new(),
        lost_reason: None,
        competitor: None,
    }
}
