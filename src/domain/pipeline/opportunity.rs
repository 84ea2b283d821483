use crate::domain::errors::PipelineError;
use crate::domain::primitives::{annualize, start_of_day};
use crate::domain::sales::UserId;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opportunity stage
///
/// `Sql → DemoBooked → DemoCompleted → SentQuote → CloseWon` is the funnel.
/// `CloseLost` and `Nurture` sit beside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sql,
    DemoBooked,
    DemoCompleted,
    SentQuote,
    CloseWon,
    CloseLost,
    Nurture,
}

impl Stage {
    /// Funnel order, first to last
    pub const PROGRESSION: [Stage; 5] = [
        Stage::Sql,
        Stage::DemoBooked,
        Stage::DemoCompleted,
        Stage::SentQuote,
        Stage::CloseWon,
    ];

    pub fn progression_index(self) -> Option<usize> {
        Self::PROGRESSION.iter().position(|s| *s == self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::CloseWon | Stage::CloseLost)
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Sql => "sql",
            Stage::DemoBooked => "demo_booked",
            Stage::DemoCompleted => "demo_completed",
            Stage::SentQuote => "sent_quote",
            Stage::CloseWon => "close_won",
            Stage::CloseLost => "close_lost",
            Stage::Nurture => "nurture",
        }
    }

    /// Forward along the funnel, sideways to lost or nurture, or from nurture
    /// back into the funnel. Terminal stages never move.
    pub fn can_transition_to(self, next: Stage) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        match next {
            Stage::CloseLost | Stage::Nurture => true,
            _ => match (self.progression_index(), next.progression_index()) {
                (Some(current), Some(target)) => target > current,
                (None, Some(_)) => true,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageChange {
    pub stage: Stage,
    pub changed_at: DateTime<Utc>,
}

/// A pipeline deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Uuid,
    pub owner_id: UserId,
    pub name: String,
    pub stage: Stage,
    pub expected_subs_monthly: Decimal,
    #[serde(default)]
    pub expected_pay_monthly: Decimal,
    /// Manual override of the stage default, 0.0-1.0
    #[serde(default)]
    pub probability: Option<Decimal>,
    #[serde(default)]
    pub expected_close_date: Option<NaiveDate>,
    #[serde(default)]
    pub actual_close_date: Option<NaiveDate>,
    pub stage_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Earlier stages, oldest first
    #[serde(default)]
    pub stage_history: Vec<StageChange>,
    #[serde(default)]
    pub lost_reason: Option<String>,
    #[serde(default)]
    pub competitor: Option<String>,
}

impl Opportunity {
    pub fn subs_arr(&self) -> Decimal {
        annualize(self.expected_subs_monthly)
    }

    pub fn pay_arr(&self) -> Decimal {
        annualize(self.expected_pay_monthly)
    }

    pub fn total_arr(&self) -> Decimal {
        self.subs_arr() + self.pay_arr()
    }

    /// First time the deal entered `stage`, from the history or the current stage.
    pub fn reached_at(&self, stage: Stage) -> Option<DateTime<Utc>> {
        self.stage_history
            .iter()
            .find(|change| change.stage == stage)
            .map(|change| change.changed_at)
            .or_else(|| (self.stage == stage).then_some(self.stage_changed_at))
    }

    /// Furthest funnel position ever reached.
    pub fn furthest_progression(&self) -> Option<usize> {
        self.stage_history
            .iter()
            .map(|change| change.stage)
            .chain(std::iter::once(self.stage))
            .filter_map(Stage::progression_index)
            .max()
    }

    /// Close time: the recorded close date, else when the deal entered `CloseWon`.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.actual_close_date
            .map(start_of_day)
            .or_else(|| self.reached_at(Stage::CloseWon))
    }

    /// Moves the deal to `next`, archiving the current stage in the history.
    pub fn transition(&self, next: Stage, at: DateTime<Utc>) -> Result<Opportunity, PipelineError> {
        if !self.stage.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }

        let mut moved = self.clone();
        moved.stage_history.push(StageChange {
            stage: self.stage,
            changed_at: self.stage_changed_at,
        });
        moved.stage = next;
        moved.stage_changed_at = at;
        if next.is_terminal() && moved.actual_close_date.is_none() {
            moved.actual_close_date = Some(at.date_naive());
        }
        Ok(moved)
    }
}
