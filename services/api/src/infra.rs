use chrono::{DateTime, Duration, NaiveDate, Utc};
use epicq::study::alerts::{
    Alert, AlertConfiguration, AlertType, Communication, NotificationDispatcher,
    NotificationError,
};
use epicq::study::recruitment::RecruitmentPeriod;
use epicq::study::{
    AlertConfigurationRepository, AlertId, AlertRepository, CaseMetrics, EthicsStatus,
    HospitalBasicInfo, HospitalContact, HospitalDetails, HospitalId, HospitalRecord,
    HospitalRepository, PeriodId, PeriodRepository, ProjectId, RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local storage backing every study repository trait.
#[derive(Default, Clone)]
pub(crate) struct InMemoryStudyStore {
    hospitals: Arc<Mutex<HashMap<HospitalId, HospitalRecord>>>,
    periods: Arc<Mutex<Vec<RecruitmentPeriod>>>,
    alerts: Arc<Mutex<Vec<Alert>>>,
    configurations: Arc<Mutex<BTreeMap<AlertType, AlertConfiguration>>>,
    period_sequence: Arc<AtomicU64>,
    alert_sequence: Arc<AtomicU64>,
}

impl InMemoryStudyStore {
    pub(crate) fn seeded(records: Vec<HospitalRecord>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.hospitals.lock().expect("hospital mutex poisoned");
            for record in records {
                guard.insert(record.basic.id.clone(), record);
            }
        }
        store
    }

    pub(crate) fn hospital_ids(&self) -> Vec<HospitalId> {
        let guard = self.hospitals.lock().expect("hospital mutex poisoned");
        let mut ids: Vec<HospitalId> = guard.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl HospitalRepository for InMemoryStudyStore {
    fn fetch_hospital(&self, id: &HospitalId) -> Result<Option<HospitalRecord>, RepositoryError> {
        let guard = self.hospitals.lock().expect("hospital mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

impl PeriodRepository for InMemoryStudyStore {
    fn periods_for(
        &self,
        hospital: &HospitalId,
    ) -> Result<Vec<RecruitmentPeriod>, RepositoryError> {
        let guard = self.periods.lock().expect("period mutex poisoned");
        let mut periods: Vec<RecruitmentPeriod> = guard
            .iter()
            .filter(|period| &period.hospital_id == hospital)
            .cloned()
            .collect();
        periods.sort_by_key(|period| period.period_number);
        Ok(periods)
    }

    fn next_period_id(&self) -> Result<PeriodId, RepositoryError> {
        let id = self.period_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(PeriodId(format!("per-{id:06}")))
    }

    fn insert_period(
        &self,
        period: RecruitmentPeriod,
    ) -> Result<RecruitmentPeriod, RepositoryError> {
        let mut guard = self.periods.lock().expect("period mutex poisoned");
        if guard.iter().any(|existing| existing.id == period.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(period.clone());
        Ok(period)
    }

    fn update_period(&self, period: RecruitmentPeriod) -> Result<(), RepositoryError> {
        let mut guard = self.periods.lock().expect("period mutex poisoned");
        match guard.iter_mut().find(|existing| existing.id == period.id) {
            Some(slot) => {
                *slot = period;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_period(&self, hospital: &HospitalId, id: &PeriodId) -> Result<(), RepositoryError> {
        let mut guard = self.periods.lock().expect("period mutex poisoned");
        let before = guard.len();
        guard.retain(|period| !(&period.hospital_id == hospital && &period.id == id));
        if guard.len() == before {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }
}

impl AlertRepository for InMemoryStudyStore {
    fn next_alert_id(&self) -> Result<AlertId, RepositoryError> {
        let id = self.alert_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(AlertId(format!("alr-{id:06}")))
    }

    fn insert_alert(&self, alert: Alert) -> Result<Alert, RepositoryError> {
        let mut guard = self.alerts.lock().expect("alert mutex poisoned");
        if guard.iter().any(|existing| existing.id == alert.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(alert.clone());
        Ok(alert)
    }

    fn update_alert(&self, alert: Alert) -> Result<(), RepositoryError> {
        let mut guard = self.alerts.lock().expect("alert mutex poisoned");
        match guard.iter_mut().find(|existing| existing.id == alert.id) {
            Some(slot) => {
                *slot = alert;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_alert(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError> {
        let guard = self.alerts.lock().expect("alert mutex poisoned");
        Ok(guard.iter().find(|alert| &alert.id == id).cloned())
    }

    fn alerts_for(
        &self,
        hospital: &HospitalId,
        include_resolved: bool,
    ) -> Result<Vec<Alert>, RepositoryError> {
        let guard = self.alerts.lock().expect("alert mutex poisoned");
        let mut alerts: Vec<Alert> = guard
            .iter()
            .filter(|alert| &alert.hospital_id == hospital)
            .filter(|alert| include_resolved || !alert.is_resolved)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }
}

impl AlertConfigurationRepository for InMemoryStudyStore {
    fn configurations(&self) -> Result<Vec<AlertConfiguration>, RepositoryError> {
        let guard = self.configurations.lock().expect("config mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn save_configuration(&self, config: AlertConfiguration) -> Result<(), RepositoryError> {
        let mut guard = self.configurations.lock().expect("config mutex poisoned");
        guard.insert(config.alert_type, config);
        Ok(())
    }
}

/// Keeps dispatched communications in memory and logs each one.
#[derive(Default, Clone)]
pub(crate) struct InMemoryOutbox {
    sent: Arc<Mutex<Vec<Communication>>>,
}

impl NotificationDispatcher for InMemoryOutbox {
    fn dispatch(&self, communication: Communication) -> Result<(), NotificationError> {
        info!(
            alert = %communication.alert_id,
            hospital = %communication.hospital_id,
            channel = ?communication.channel,
            recipient = ?communication.recipient,
            "communication queued"
        );
        let mut guard = self.sent.lock().expect("outbox mutex poisoned");
        guard.push(communication);
        Ok(())
    }
}

impl InMemoryOutbox {
    pub(crate) fn sent(&self) -> Vec<Communication> {
        self.sent.lock().expect("outbox mutex poisoned").clone()
    }
}

fn sample_contact(
    name: &str,
    email: &str,
    phone: Option<&str>,
    specialty: &str,
) -> HospitalContact {
    HospitalContact {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        phone: phone.map(str::to_string),
        specialty: Some(specialty.to_string()),
        is_primary: true,
    }
}

/// Three participating hospitals in different states, used by the demo and local servers.
pub(crate) fn sample_hospitals(now: DateTime<Utc>) -> Vec<HospitalRecord> {
    let project = Some(ProjectId("epicq-2025".to_string()));
    let today = now.date_naive();
    let days_ago = |days: i64| -> NaiveDate { today - Duration::days(days) };

    vec![
        HospitalRecord {
            basic: HospitalBasicInfo {
                id: HospitalId("hosp-001".to_string()),
                project_id: project.clone(),
                name: Some("Hospital de Clínicas".to_string()),
                province: Some("CABA".to_string()),
                city: Some("Buenos Aires".to_string()),
                participated_lasos: Some(true),
                created_at: now - Duration::days(120),
            },
            details: Some(HospitalDetails {
                number_of_beds: Some(480),
                number_of_operating_rooms: Some(14),
                number_of_icu_beds: Some(36),
                average_weekly_surgeries: Some(210),
                financing_type: Some("public".to_string()),
                has_preop_clinic: Some("always".to_string()),
                has_residency_program: Some(true),
                has_rapid_response_team: Some(true),
                has_ethics_committee: Some(true),
                university_affiliated: Some(true),
            }),
            contacts: vec![sample_contact(
                "Dra. Lucía Fernández",
                "lfernandez@example.org",
                Some("+54 11 5950-8000"),
                "Anestesiología",
            )],
            cases: CaseMetrics {
                total_cases: 64,
                average_completion: Some(91.5),
                last_case_at: Some(now - Duration::days(1)),
            },
            ethics: EthicsStatus {
                submitted_on: Some(days_ago(110)),
                approved_on: Some(days_ago(80)),
            },
        },
        HospitalRecord {
            basic: HospitalBasicInfo {
                id: HospitalId("hosp-002".to_string()),
                project_id: project.clone(),
                name: Some("Hospital Regional Neuquén".to_string()),
                province: Some("Neuquén".to_string()),
                city: Some("Neuquén".to_string()),
                participated_lasos: Some(false),
                created_at: now - Duration::days(45),
            },
            details: Some(HospitalDetails {
                number_of_beds: Some(220),
                number_of_operating_rooms: Some(6),
                number_of_icu_beds: Some(12),
                average_weekly_surgeries: Some(70),
                financing_type: Some("mixed".to_string()),
                has_preop_clinic: Some("sometimes".to_string()),
                ..HospitalDetails::default()
            }),
            contacts: vec![sample_contact(
                "Dr. Tomás Aguirre",
                "taguirre@example.org",
                None,
                "Cirugía General",
            )],
            cases: CaseMetrics {
                total_cases: 9,
                average_completion: Some(58.0),
                last_case_at: Some(now - Duration::days(38)),
            },
            ethics: EthicsStatus {
                submitted_on: Some(days_ago(75)),
                approved_on: None,
            },
        },
        HospitalRecord {
            basic: HospitalBasicInfo {
                id: HospitalId("hosp-003".to_string()),
                project_id: project,
                name: Some("Sanatorio del Norte".to_string()),
                province: Some("Tucumán".to_string()),
                city: Some("San Miguel de Tucumán".to_string()),
                participated_lasos: None,
                created_at: now - Duration::days(3),
            },
            details: None,
            contacts: Vec::new(),
            cases: CaseMetrics::default(),
            ethics: EthicsStatus::default(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alerts_are_listed_newest_first() {
        let store = InMemoryStudyStore::default();
        let hospital = HospitalId("hosp-001".to_string());
        let now = Utc::now();
        for (id, age) in [("alr-1", 2), ("alr-2", 1)] {
            let draft = epicq::study::alerts::AlertDraft {
                alert_type: AlertType::NoActivity,
                severity: epicq::study::alerts::AlertSeverity::High,
                title: "idle".to_string(),
                message: "idle".to_string(),
                metadata: serde_json::Value::Null,
            };
            store
                .insert_alert(Alert::open(
                    AlertId(id.to_string()),
                    hospital.clone(),
                    None,
                    draft,
                    now - Duration::days(age),
                ))
                .expect("insert");
        }

        let listed = store.alerts_for(&hospital, false).expect("list");
        let ids: Vec<&str> = listed.iter().map(|alert| alert.id.0.as_str()).collect();
        assert_eq!(ids, vec!["alr-2", "alr-1"]);
    }

    #[test]
    fn deleting_unknown_period_is_not_found() {
        let store = InMemoryStudyStore::seeded(sample_hospitals(Utc::now()));
        assert_eq!(store.hospital_ids().len(), 3);
        let err = store
            .delete_period(
                &HospitalId("hosp-001".to_string()),
                &PeriodId("per-missing".to_string()),
            )
            .expect_err("nothing to delete");
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[test]
    fn identifiers_are_allocated_per_store() {
        let store = InMemoryStudyStore::default();
        assert_eq!(
            store.next_period_id().expect("period id"),
            PeriodId("per-000001".to_string())
        );
        assert_eq!(
            store.next_period_id().expect("period id"),
            PeriodId("per-000002".to_string())
        );
        assert_eq!(
            store.next_alert_id().expect("alert id"),
            AlertId("alr-000001".to_string())
        );

        let clone = store.clone();
        assert_eq!(
            clone.next_period_id().expect("period id"),
            PeriodId("per-000003".to_string())
        );
    }
}
