use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::StudyConfig;
use crate::study::alerts::{
    Alert, AlertConfiguration, AlertType, Communication, NotificationDispatcher,
    NotificationError,
};
use crate::study::domain::{AlertId, HospitalId, PeriodId};
use crate::study::hospital::{
    CaseMetrics, EthicsStatus, HospitalBasicInfo, HospitalContact, HospitalDetails,
    HospitalRecord,
};
use crate::study::recruitment::RecruitmentPeriod;
use crate::study::repository::{
    AlertConfigurationRepository, AlertRepository, HospitalRepository, PeriodRepository,
    RepositoryError,
};
use crate::study::{PeriodRequest, StudyService};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn hospital_id() -> HospitalId {
    HospitalId("hosp-001".to_string())
}

/// A hospital with every standard field answered and recent case activity.
pub(super) fn complete_hospital(created_at: DateTime<Utc>, today: DateTime<Utc>) -> HospitalRecord {
    HospitalRecord {
        basic: HospitalBasicInfo {
            id: hospital_id(),
            project_id: None,
            name: Some("Hospital El Cruce".to_string()),
            province: Some("Buenos Aires".to_string()),
            city: Some("Florencio Varela".to_string()),
            participated_lasos: Some(false),
            created_at,
        },
        details: Some(HospitalDetails {
            number_of_beds: Some(420),
            number_of_operating_rooms: Some(12),
            number_of_icu_beds: Some(30),
            average_weekly_surgeries: Some(150),
            financing_type: Some("public".to_string()),
            has_preop_clinic: Some("always".to_string()),
            has_residency_program: Some(true),
            has_rapid_response_team: None,
            has_ethics_committee: Some(true),
            university_affiliated: None,
        }),
        contacts: vec![HospitalContact {
            name: Some("Dra. Paula Ríos".to_string()),
            email: Some("prios@example.org".to_string()),
            phone: Some("+54 11 4210-9000".to_string()),
            specialty: Some("Anestesiología".to_string()),
            is_primary: true,
        }],
        cases: CaseMetrics {
            total_cases: 18,
            average_completion: Some(88.0),
            last_case_at: Some(today - Duration::days(2)),
        },
        ethics: EthicsStatus {
            submitted_on: Some(date(2025, 2, 10)),
            approved_on: Some(date(2025, 3, 1)),
        },
    }
}

/// Same hospital with the coordinator phone left blank.
pub(super) fn hospital_missing_phone(
    created_at: DateTime<Utc>,
    today: DateTime<Utc>,
) -> HospitalRecord {
    let mut record = complete_hospital(created_at, today);
    record.contacts[0].phone = Some(String::new());
    record
}

pub(super) fn period_request(start: NaiveDate, end: NaiveDate) -> PeriodRequest {
    PeriodRequest {
        start_date: start,
        end_date: end,
        period_id: None,
        target_cases: None,
        notes: None,
    }
}

pub(super) fn build_service(
    store: MemoryStore,
) -> (
    StudyService<MemoryStore, MemoryNotifier>,
    Arc<MemoryStore>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(store);
    let notifier = Arc::new(MemoryNotifier::default());
    let service = StudyService::new(store.clone(), notifier.clone(), &StudyConfig::default());
    (service, store, notifier)
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    hospitals: Arc<Mutex<HashMap<HospitalId, HospitalRecord>>>,
    periods: Arc<Mutex<Vec<RecruitmentPeriod>>>,
    alerts: Arc<Mutex<Vec<Alert>>>,
    configurations: Arc<Mutex<BTreeMap<AlertType, AlertConfiguration>>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryStore {
    pub(super) fn with_hospital(record: HospitalRecord) -> Self {
        let store = Self::default();
        store.put_hospital(record);
        store
    }

    pub(super) fn put_hospital(&self, record: HospitalRecord) {
        self.hospitals
            .lock()
            .expect("hospital mutex poisoned")
            .insert(record.basic.id.clone(), record);
    }

    pub(super) fn all_alerts(&self) -> Vec<Alert> {
        self.alerts.lock().expect("alert mutex poisoned").clone()
    }
}

impl HospitalRepository for MemoryStore {
    fn fetch_hospital(&self, id: &HospitalId) -> Result<Option<HospitalRecord>, RepositoryError> {
        let guard = self.hospitals.lock().expect("hospital mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

impl PeriodRepository for MemoryStore {
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
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
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
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == period.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = period;
        Ok(())
    }

    fn delete_period(&self, hospital: &HospitalId, id: &PeriodId) -> Result<(), RepositoryError> {
        let mut guard = self.periods.lock().expect("period mutex poisoned");
        let before = guard.len();
        guard.retain(|period| !(&period.hospital_id == hospital && &period.id == id));
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl AlertRepository for MemoryStore {
    fn next_alert_id(&self) -> Result<AlertId, RepositoryError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(AlertId(format!("alr-{id:06}")))
    }

    fn insert_alert(&self, alert: Alert) -> Result<Alert, RepositoryError> {
        let mut guard = self.alerts.lock().expect("alert mutex poisoned");
        guard.push(alert.clone());
        Ok(alert)
    }

    fn update_alert(&self, alert: Alert) -> Result<(), RepositoryError> {
        let mut guard = self.alerts.lock().expect("alert mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == alert.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = alert;
        Ok(())
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
        Ok(guard
            .iter()
            .rev()
            .filter(|alert| &alert.hospital_id == hospital)
            .filter(|alert| include_resolved || !alert.is_resolved)
            .cloned()
            .collect())
    }
}

impl AlertConfigurationRepository for MemoryStore {
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

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    sent: Arc<Mutex<Vec<Communication>>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<Communication> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationDispatcher for MemoryNotifier {
    fn dispatch(&self, communication: Communication) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(communication);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl NotificationDispatcher for OfflineNotifier {
    fn dispatch(&self, _communication: Communication) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl HospitalRepository for UnavailableStore {
    fn fetch_hospital(&self, _id: &HospitalId) -> Result<Option<HospitalRecord>, RepositoryError> {
        offline()
    }
}

impl PeriodRepository for UnavailableStore {
    fn periods_for(
        &self,
        _hospital: &HospitalId,
    ) -> Result<Vec<RecruitmentPeriod>, RepositoryError> {
        offline()
    }

    fn next_period_id(&self) -> Result<PeriodId, RepositoryError> {
        offline()
    }

    fn insert_period(
        &self,
        _period: RecruitmentPeriod,
    ) -> Result<RecruitmentPeriod, RepositoryError> {
        offline()
    }

    fn update_period(&self, _period: RecruitmentPeriod) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_period(&self, _hospital: &HospitalId, _id: &PeriodId) -> Result<(), RepositoryError> {
        offline()
    }
}

impl AlertRepository for UnavailableStore {
    fn next_alert_id(&self) -> Result<AlertId, RepositoryError> {
        offline()
    }

    fn insert_alert(&self, _alert: Alert) -> Result<Alert, RepositoryError> {
        offline()
    }

    fn update_alert(&self, _alert: Alert) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_alert(&self, _id: &AlertId) -> Result<Option<Alert>, RepositoryError> {
        offline()
    }

    fn alerts_for(
        &self,
        _hospital: &HospitalId,
        _include_resolved: bool,
    ) -> Result<Vec<Alert>, RepositoryError> {
        offline()
    }
}

impl AlertConfigurationRepository for UnavailableStore {
    fn configurations(&self) -> Result<Vec<AlertConfiguration>, RepositoryError> {
        offline()
    }

    fn save_configuration(&self, _config: AlertConfiguration) -> Result<(), RepositoryError> {
        offline()
    }
}

/// Wraps a [`MemoryStore`] and stalls every read, widening the gap between a
/// service's read and its following write.
pub(super) struct SlowStore {
    inner: MemoryStore,
    delay: std::time::Duration,
}

impl SlowStore {
    pub(super) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            delay: std::time::Duration::from_millis(5),
        }
    }

    fn stall(&self) {
        thread::sleep(self.delay);
    }
}

impl HospitalRepository for SlowStore {
    fn fetch_hospital(&self, id: &HospitalId) -> Result<Option<HospitalRecord>, RepositoryError> {
        self.inner.fetch_hospital(id)
    }
}

impl PeriodRepository for SlowStore {
    fn periods_for(
        &self,
        hospital: &HospitalId,
    ) -> Result<Vec<RecruitmentPeriod>, RepositoryError> {
        let periods = self.inner.periods_for(hospital);
        self.stall();
        periods
    }

    fn next_period_id(&self) -> Result<PeriodId, RepositoryError> {
        self.inner.next_period_id()
    }

    fn insert_period(
        &self,
        period: RecruitmentPeriod,
    ) -> Result<RecruitmentPeriod, RepositoryError> {
        self.inner.insert_period(period)
    }

    fn update_period(&self, period: RecruitmentPeriod) -> Result<(), RepositoryError> {
        self.inner.update_period(period)
    }

    fn delete_period(&self, hospital: &HospitalId, id: &PeriodId) -> Result<(), RepositoryError> {
        self.inner.delete_period(hospital, id)
    }
}

impl AlertRepository for SlowStore {
    fn next_alert_id(&self) -> Result<AlertId, RepositoryError> {
        self.inner.next_alert_id()
    }

    fn insert_alert(&self, alert: Alert) -> Result<Alert, RepositoryError> {
        self.inner.insert_alert(alert)
    }

    fn update_alert(&self, alert: Alert) -> Result<(), RepositoryError> {
        self.inner.update_alert(alert)
    }

    fn fetch_alert(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError> {
        self.inner.fetch_alert(id)
    }

    fn alerts_for(
        &self,
        hospital: &HospitalId,
        include_resolved: bool,
    ) -> Result<Vec<Alert>, RepositoryError> {
        let alerts = self.inner.alerts_for(hospital, include_resolved);
        self.stall();
        alerts
    }
}

impl AlertConfigurationRepository for SlowStore {
    fn configurations(&self) -> Result<Vec<AlertConfiguration>, RepositoryError> {
        self.inner.configurations()
    }

    fn save_configuration(&self, config: AlertConfiguration) -> Result<(), RepositoryError> {
        self.inner.save_configuration(config)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
