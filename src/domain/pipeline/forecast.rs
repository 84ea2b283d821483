use super::opportunity::{Opportunity, Stage};
use crate::domain::primitives::{annualize, days_between, percent};
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution, Median};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Default close probability per open stage. Won and lost are fixed at 1 and 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageProbabilities {
    pub sql: Decimal,
    pub demo_booked: Decimal,
    pub demo_completed: Decimal,
    pub sent_quote: Decimal,
    pub nurture: Decimal,
}

impl Default for StageProbabilities {
    fn default() -> Self {
        Self {
            sql: dec!(0.1),
            demo_booked: dec!(0.3),
            demo_completed: dec!(0.5),
            sent_quote: dec!(0.7),
            nurture: dec!(0.05),
        }
    }
}

impl StageProbabilities {
    pub fn for_stage(&self, stage: Stage) -> Decimal {
        match stage {
            Stage::Sql => self.sql,
            Stage::DemoBooked => self.demo_booked,
            Stage::DemoCompleted => self.demo_completed,
            Stage::SentQuote => self.sent_quote,
            Stage::Nurture => self.nurture,
            Stage::CloseWon => Decimal::ONE,
            Stage::CloseLost => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub stage_probabilities: StageProbabilities,
    /// Days without a stage change before an open deal counts as stuck
    pub stuck_threshold_days: u32,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            stage_probabilities: StageProbabilities::default(),
            stuck_threshold_days: 7,
        }
    }
}

pub fn calculate_arr(monthly: Decimal) -> Decimal {
    annualize(monthly)
}

/// Manual override clamped to 0..=1, else the stage default.
pub fn effective_probability(opportunity: &Opportunity, probabilities: &StageProbabilities) -> Decimal {
    opportunity
        .probability
        .map(|p| p.clamp(Decimal::ZERO, Decimal::ONE))
        .unwrap_or_else(|| probabilities.for_stage(opportunity.stage))
}

pub fn weighted_value(opportunity: &Opportunity, probabilities: &StageProbabilities) -> Decimal {
    opportunity.total_arr() * effective_probability(opportunity, probabilities)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: Stage,
    pub count: usize,
    /// Relative to the first funnel stage
    pub conversion_percent: Decimal,
}

/// Average days per transition over won deals. `None` when no deal qualifies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleTimes {
    pub created_to_demo: Option<Decimal>,
    pub demo_to_quote: Option<Decimal>,
    pub quote_to_close: Option<Decimal>,
    pub total: Option<Decimal>,
    pub median_total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBucket {
    pub year: i32,
    pub month: u32,
    pub count: usize,
    pub total_arr: Decimal,
    pub weighted_arr: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostReason {
    pub reason: String,
    pub count: usize,
    pub arr: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub total_pipeline: Decimal,
    pub weighted_pipeline: Decimal,
    pub active_deals: usize,
    pub overdue_deals: usize,
    pub stuck_deals: usize,
    pub funnel: Vec<FunnelStage>,
    pub won_deals: usize,
    pub won_arr: Decimal,
    pub lost_deals: usize,
    pub win_rate_percent: Decimal,
    pub cycle_times: CycleTimes,
    pub monthly: Vec<ForecastBucket>,
    pub lost_reasons: Vec<LostReason>,
}

const UNSPECIFIED_REASON: &str = "unspecified";

#[derive(Debug, Clone, Default)]
pub struct PipelineForecastEngine {
    settings: ForecastSettings,
}

impl PipelineForecastEngine {
    pub fn new(settings: ForecastSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    pub fn forecast(&self, opportunities: &[Opportunity], as_of: DateTime<Utc>) -> ForecastResult {
        let probabilities = &self.settings.stage_probabilities;
        let today = as_of.date_naive();
        let stuck_after = f64::from(self.settings.stuck_threshold_days);

        let active: Vec<&Opportunity> = opportunities.iter().filter(|o| o.stage.is_active()).collect();
        let won: Vec<&Opportunity> = opportunities
            .iter()
            .filter(|o| o.stage == Stage::CloseWon)
            .collect();
        let lost: Vec<&Opportunity> = opportunities
            .iter()
            .filter(|o| o.stage == Stage::CloseLost)
            .collect();

        let total_pipeline = active.iter().map(|o| o.total_arr()).sum();
        let weighted_pipeline = active.iter().map(|o| weighted_value(o, probabilities)).sum();
        let overdue_deals = active
            .iter()
            .filter(|o| o.expected_close_date.is_some_and(|d| d < today))
            .count();
        let stuck_deals = active
            .iter()
            .filter(|o| days_between(o.stage_changed_at, as_of) > stuck_after)
            .count();

        let won_deals = won.len();
        let lost_deals = lost.len();
        let result = ForecastResult {
            total_pipeline,
            weighted_pipeline,
            active_deals: active.len(),
            overdue_deals,
            stuck_deals,
            funnel: funnel(opportunities),
            won_deals,
            won_arr: won.iter().map(|o| o.total_arr()).sum(),
            lost_deals,
            win_rate_percent: percent(
                Decimal::from(won_deals),
                Decimal::from(won_deals + lost_deals),
            ),
            cycle_times: cycle_times(&won),
            monthly: self.monthly_buckets(&active, as_of),
            lost_reasons: lost_reasons(&lost),
        };

        debug!(
            "PipelineForecastEngine: {} deals, {} active, weighted {} of {}",
            opportunities.len(),
            result.active_deals,
            result.weighted_pipeline,
            result.total_pipeline
        );
        result
    }

    fn monthly_buckets(&self, active: &[&Opportunity], as_of: DateTime<Utc>) -> Vec<ForecastBucket> {
        let probabilities = &self.settings.stage_probabilities;
        let first = (as_of.year(), as_of.month());

        let mut buckets: BTreeMap<(i32, u32), ForecastBucket> = BTreeMap::new();
        for opp in active {
            let Some(close) = opp.expected_close_date else {
                continue;
            };
            let key = (close.year(), close.month());
            if key < first {
                continue;
            }
            let bucket = buckets.entry(key).or_insert_with(|| ForecastBucket {
                year: key.0,
                month: key.1,
                count: 0,
                total_arr: Decimal::ZERO,
                weighted_arr: Decimal::ZERO,
            });
            bucket.count += 1;
            bucket.total_arr += opp.total_arr();
            bucket.weighted_arr += weighted_value(opp, probabilities);
        }
        buckets.into_values().collect()
    }
}

/// Counts every distinct deal at each stage up to the furthest it ever
/// reached. Records sharing an id count once, at their furthest stage.
fn funnel(opportunities: &[Opportunity]) -> Vec<FunnelStage> {
    let mut furthest_by_deal: BTreeMap<Uuid, usize> = BTreeMap::new();
    for opp in opportunities {
        if let Some(furthest) = opp.furthest_progression() {
            let entry = furthest_by_deal.entry(opp.id).or_insert(furthest);
            *entry = (*entry).max(furthest);
        }
    }

    let mut counts = [0usize; Stage::PROGRESSION.len()];
    for furthest in furthest_by_deal.into_values() {
        for count in counts.iter_mut().take(furthest + 1) {
            *count += 1;
        }
    }

    let first = Decimal::from(counts[0]);
    Stage::PROGRESSION
        .iter()
        .zip(counts)
        .map(|(stage, count)| FunnelStage {
            stage: *stage,
            count,
            conversion_percent: percent(Decimal::from(count), first),
        })
        .collect()
}

fn cycle_times(won: &[&Opportunity]) -> CycleTimes {
    let mut created_to_demo = Vec::new();
    let mut demo_to_quote = Vec::new();
    let mut quote_to_close = Vec::new();
    let mut total = Vec::new();

    for opp in won {
        let demo = opp
            .reached_at(Stage::DemoCompleted)
            .or_else(|| opp.reached_at(Stage::DemoBooked));
        let quote = opp.reached_at(Stage::SentQuote);
        let close = opp.closed_at();

        if let Some(demo) = demo {
            created_to_demo.push(days_between(opp.created_at, demo));
        }
        if let (Some(demo), Some(quote)) = (demo, quote) {
            demo_to_quote.push(days_between(demo, quote));
        }
        if let (Some(quote), Some(close)) = (quote, close) {
            quote_to_close.push(days_between(quote, close));
        }
        if let Some(close) = close {
            total.push(days_between(opp.created_at, close));
        }
    }

    CycleTimes {
        created_to_demo: mean_days(created_to_demo),
        demo_to_quote: mean_days(demo_to_quote),
        quote_to_close: mean_days(quote_to_close),
        median_total: median_days(total.clone()),
        total: mean_days(total),
    }
}

// f64 boundary for statrs, rounded back to one decimal place
fn mean_days(samples: Vec<f64>) -> Option<Decimal> {
    if samples.is_empty() {
        return None;
    }
    Data::new(samples).mean().and_then(to_days)
}

fn median_days(samples: Vec<f64>) -> Option<Decimal> {
    if samples.is_empty() {
        return None;
    }
    to_days(Data::new(samples).median())
}

fn to_days(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(1))
}

fn lost_reasons(lost: &[&Opportunity]) -> Vec<LostReason> {
    let mut grouped: BTreeMap<&str, LostReason> = BTreeMap::new();
    for opp in lost {
        let reason = opp
            .lost_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(UNSPECIFIED_REASON);
        let entry = grouped.entry(reason).or_insert_with(|| LostReason {
            reason: reason.to_string(),
            count: 0,
            arr: Decimal::ZERO,
        });
        entry.count += 1;
        entry.arr += opp.total_arr();
    }

    let mut reasons: Vec<LostReason> = grouped.into_values().collect();
    reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    reasons
}
