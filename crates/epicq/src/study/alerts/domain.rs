use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::study::domain::{AlertId, HospitalId, ProjectId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertType {
    #[serde(rename = "no_activity_30_days")]
    NoActivity,
    #[serde(rename = "low_completion_rate")]
    LowCompletionRate,
    #[serde(rename = "upcoming_recruitment_period")]
    UpcomingRecruitmentPeriod,
    #[serde(rename = "ethics_approval_pending")]
    EthicsApprovalPending,
    #[serde(rename = "missing_documentation")]
    MissingDocumentation,
}

impl AlertType {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::NoActivity,
            Self::LowCompletionRate,
            Self::UpcomingRecruitmentPeriod,
            Self::EthicsApprovalPending,
            Self::MissingDocumentation,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoActivity => "no_activity_30_days",
            Self::LowCompletionRate => "low_completion_rate",
            Self::UpcomingRecruitmentPeriod => "upcoming_recruitment_period",
            Self::EthicsApprovalPending => "ethics_approval_pending",
            Self::MissingDocumentation => "missing_documentation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
    }

    /// Threshold used when no configuration has been saved for the type.
    pub const fn default_threshold(self) -> u32 {
        match self {
            Self::NoActivity => 30,
            Self::LowCompletionRate => 70,
            Self::UpcomingRecruitmentPeriod => 7,
            Self::EthicsApprovalPending => 60,
            Self::MissingDocumentation => 7,
        }
    }

    /// Upper bound accepted for the threshold.
    pub const fn max_threshold(self) -> u32 {
        match self {
            Self::LowCompletionRate => 100,
            _ => 365,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Per-type switches read before each evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfiguration {
    pub alert_type: AlertType,
    pub enabled: bool,
    pub notify_admin: bool,
    pub notify_coordinator: bool,
    pub auto_send_email: bool,
    pub threshold_value: u32,
}

impl AlertConfiguration {
    pub fn default_for(alert_type: AlertType) -> Self {
        Self {
            alert_type,
            enabled: true,
            notify_admin: true,
            notify_coordinator: true,
            auto_send_email: false,
            threshold_value: alert_type.default_threshold(),
        }
    }
}

/// Saved configurations, falling back to defaults for unsaved types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertConfigurationSet {
    saved: BTreeMap<AlertType, AlertConfiguration>,
}

impl AlertConfigurationSet {
    pub fn new<I>(configurations: I) -> Self
    where
        I: IntoIterator<Item = AlertConfiguration>,
    {
        Self {
            saved: configurations
                .into_iter()
                .map(|config| (config.alert_type, config))
                .collect(),
        }
    }

    pub fn for_type(&self, alert_type: AlertType) -> AlertConfiguration {
        self.saved
            .get(&alert_type)
            .cloned()
            .unwrap_or_else(|| AlertConfiguration::default_for(alert_type))
    }

    pub fn is_enabled(&self, alert_type: AlertType) -> bool {
        self.for_type(alert_type).enabled
    }

    /// One entry per alert type, in display order.
    pub fn all(&self) -> Vec<AlertConfiguration> {
        AlertType::ordered()
            .into_iter()
            .map(|alert_type| self.for_type(alert_type))
            .collect()
    }
}

/// Output of a rule that fired, before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDraft {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub hospital_id: HospitalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub is_resolved: bool,
    pub auto_resolved: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolved_by: Option<UserId>,
    pub metadata: serde_json::Value,
}

impl Alert {
    pub fn open(
        id: AlertId,
        hospital_id: HospitalId,
        project_id: Option<ProjectId>,
        draft: AlertDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            hospital_id,
            project_id,
            alert_type: draft.alert_type,
            severity: draft.severity,
            title: draft.title,
            message: draft.message,
            is_resolved: false,
            auto_resolved: false,
            created_at: now,
            resolved_at: None,
            resolved_by: None,
            metadata: draft.metadata,
        }
    }

    pub fn resolve_manually(
        &mut self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), AlertAlreadyResolved> {
        if self.is_resolved {
            return Err(AlertAlreadyResolved(self.id.clone()));
        }
        self.is_resolved = true;
        self.auto_resolved = false;
        self.resolved_at = Some(now);
        self.resolved_by = Some(user);
        Ok(())
    }

    /// Closes the alert because its condition no longer holds.
    pub fn resolve_automatically(&mut self, now: DateTime<Utc>) {
        if self.is_resolved {
            return;
        }
        self.is_resolved = true;
        self.auto_resolved = true;
        self.resolved_at = Some(now);
        self.resolved_by = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("alert {0} is already resolved")]
pub struct AlertAlreadyResolved(pub AlertId);
