use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use super::fields::{field_value, FieldKey, HospitalFormField};
use crate::study::hospital::{HospitalBasicInfo, HospitalContact, HospitalDetails, HospitalRecord};

/// Fields the coordinator must answer before the hospital form counts as complete.
const STANDARD_REQUIRED: [FieldKey; 11] = [
    FieldKey::ParticipatedLasos,
    FieldKey::NumberOfBeds,
    FieldKey::NumberOfOperatingRooms,
    FieldKey::NumberOfIcuBeds,
    FieldKey::AverageWeeklySurgeries,
    FieldKey::FinancingType,
    FieldKey::PreopClinic,
    FieldKey::CoordinatorName,
    FieldKey::CoordinatorEmail,
    FieldKey::CoordinatorPhone,
    FieldKey::CoordinatorSpecialty,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub percentage: u8,
    pub is_complete: bool,
    pub missing_fields: Vec<&'static str>,
    pub completed_count: usize,
    pub total_required: usize,
}

/// Scores the hospital form from the basic info, structural details and primary contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HospitalCompletionScorer {
    required: BTreeSet<FieldKey>,
}

impl Default for HospitalCompletionScorer {
    fn default() -> Self {
        Self::standard()
    }
}

impl HospitalCompletionScorer {
    pub fn standard() -> Self {
        Self::with_required(STANDARD_REQUIRED)
    }

    pub fn with_required<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = FieldKey>,
    {
        Self {
            required: keys.into_iter().collect(),
        }
    }

    pub fn requiring(mut self, key: FieldKey) -> Self {
        self.required.insert(key);
        self
    }

    pub fn is_required(&self, key: FieldKey) -> bool {
        self.required.contains(&key)
    }

    /// Full checklist in display order, optional entries included.
    pub fn checklist(
        &self,
        basic: &HospitalBasicInfo,
        details: Option<&HospitalDetails>,
        contact: Option<&HospitalContact>,
    ) -> Vec<HospitalFormField> {
        FieldKey::ordered()
            .into_iter()
            .map(|key| HospitalFormField {
                key,
                label: key.label(),
                value: field_value(key, basic, details, contact),
                required: self.is_required(key),
            })
            .collect()
    }

    pub fn score(
        &self,
        basic: &HospitalBasicInfo,
        details: Option<&HospitalDetails>,
        contact: Option<&HospitalContact>,
    ) -> CompletionResult {
        let required: Vec<HospitalFormField> = self
            .checklist(basic, details, contact)
            .into_iter()
            .filter(|field| field.required)
            .collect();

        let total_required = required.len();
        let missing_fields: Vec<&'static str> = required
            .iter()
            .filter(|field| !field.is_complete())
            .map(|field| field.label)
            .collect();
        let completed_count = total_required - missing_fields.len();

        let percentage = if total_required == 0 {
            0
        } else {
            ((completed_count as f64 / total_required as f64) * 100.0)
                .round()
                .clamp(0.0, 100.0) as u8
        };

        CompletionResult {
            percentage,
            is_complete: total_required > 0 && completed_count == total_required,
            missing_fields,
            completed_count,
            total_required,
        }
    }

    pub fn score_record(&self, record: &HospitalRecord) -> CompletionResult {
        self.score(
            &record.basic,
            record.details.as_ref(),
            record.primary_contact(),
        )
    }
}

/// Form status block returned by the coordinator dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalFormStatus {
    pub is_complete: bool,
    pub is_urgent: bool,
    pub missing_fields: Vec<&'static str>,
    pub completed_steps: usize,
    pub total_steps: usize,
}

impl HospitalFormStatus {
    pub fn new(
        result: &CompletionResult,
        hospital_created_at: DateTime<Utc>,
        now: DateTime<Utc>,
        urgency_window: Duration,
    ) -> Self {
        Self {
            is_complete: result.is_complete,
            is_urgent: is_urgent(result, hospital_created_at, now, urgency_window),
            missing_fields: result.missing_fields.clone(),
            completed_steps: result.completed_count,
            total_steps: result.total_required,
        }
    }
}

/// An incomplete form becomes urgent once the hospital is older than the window.
pub fn is_urgent(
    result: &CompletionResult,
    hospital_created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    urgency_window: Duration,
) -> bool {
    !result.is_complete && now - hospital_created_at > urgency_window
}
