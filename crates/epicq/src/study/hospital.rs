use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{HospitalId, ProjectId};

/// Identity fields captured when an admin registers a hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalBasicInfo {
    pub id: HospitalId,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub participated_lasos: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// Structural attributes the coordinator reports in the hospital form.
///
/// Every field is optional: `None` means the coordinator has not answered yet,
/// which is different from an explicit `Some(false)` or `Some(0)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HospitalDetails {
    pub number_of_beds: Option<u32>,
    pub number_of_operating_rooms: Option<u32>,
    pub number_of_icu_beds: Option<u32>,
    pub average_weekly_surgeries: Option<u32>,
    pub financing_type: Option<String>,
    pub has_preop_clinic: Option<String>,
    pub has_residency_program: Option<bool>,
    pub has_rapid_response_team: Option<bool>,
    pub has_ethics_committee: Option<bool>,
    pub university_affiliated: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HospitalContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub is_primary: bool,
}

/// Case-report activity rolled up for a hospital.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseMetrics {
    pub total_cases: u32,
    /// Mean completion percentage across the hospital's case forms.
    pub average_completion: Option<f64>,
    pub last_case_at: Option<DateTime<Utc>>,
}

/// Ethics committee submission tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthicsStatus {
    pub submitted_on: Option<NaiveDate>,
    pub approved_on: Option<NaiveDate>,
}

impl EthicsStatus {
    pub fn is_pending(&self) -> bool {
        self.submitted_on.is_some() && self.approved_on.is_none()
    }
}

/// Everything the storage layer knows about a single hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub basic: HospitalBasicInfo,
    #[serde(default)]
    pub details: Option<HospitalDetails>,
    #[serde(default)]
    pub contacts: Vec<HospitalContact>,
    #[serde(default)]
    pub cases: CaseMetrics,
    #[serde(default)]
    pub ethics: EthicsStatus,
}

impl HospitalRecord {
    /// The contact flagged as primary, falling back to the first one listed.
    pub fn primary_contact(&self) -> Option<&HospitalContact> {
        self.contacts
            .iter()
            .find(|contact| contact.is_primary)
            .or_else(|| self.contacts.first())
    }
}
