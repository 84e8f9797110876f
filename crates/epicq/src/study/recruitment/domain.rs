use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::validator::PeriodWindow;
use crate::study::domain::{HospitalId, PeriodId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

impl PeriodStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planned" => Some(Self::Planned),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// planned -> active -> completed, and planned/active -> cancelled.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Planned, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Planned, Self::Cancelled)
                | (Self::Active, Self::Cancelled)
        )
    }

    /// Completed periods are part of the study record and can no longer change.
    pub const fn is_locked(self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruitmentPeriod {
    pub id: PeriodId,
    pub hospital_id: HospitalId,
    pub period_number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_cases: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RecruitmentPeriod {
    pub fn window(&self) -> PeriodWindow {
        PeriodWindow {
            id: Some(self.id.clone()),
            period_number: self.period_number,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    pub fn transition(&mut self, next: PeriodStatus) -> Result<(), PeriodTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(PeriodTransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Days from `today` until the period opens; negative once it has started.
    pub fn days_until_start(&self, today: NaiveDate) -> i64 {
        (self.start_date - today).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move recruitment period from {} to {}", .from.label(), .to.label())]
pub struct PeriodTransitionError {
    pub from: PeriodStatus,
    pub to: PeriodStatus,
}
