use super::alerts::{Alert, AlertConfiguration};
use super::domain::{AlertId, HospitalId, PeriodId};
use super::hospital::HospitalRecord;
use super::recruitment::RecruitmentPeriod;

/// Read access to hospital aggregates maintained by the admin tooling.
pub trait HospitalRepository: Send + Sync {
    fn fetch_hospital(&self, id: &HospitalId) -> Result<Option<HospitalRecord>, RepositoryError>;
}

/// Storage for recruitment periods, keyed by hospital.
pub trait PeriodRepository: Send + Sync {
    /// Periods of one hospital ordered by period number.
    fn periods_for(&self, hospital: &HospitalId) -> Result<Vec<RecruitmentPeriod>, RepositoryError>;
    /// Allocates an id no stored period uses.
    fn next_period_id(&self) -> Result<PeriodId, RepositoryError>;
    fn insert_period(
        &self,
        period: RecruitmentPeriod,
    ) -> Result<RecruitmentPeriod, RepositoryError>;
    fn update_period(&self, period: RecruitmentPeriod) -> Result<(), RepositoryError>;
    fn delete_period(&self, hospital: &HospitalId, id: &PeriodId) -> Result<(), RepositoryError>;
}

pub trait AlertRepository: Send + Sync {
    /// Allocates an id no stored alert uses.
    fn next_alert_id(&self) -> Result<AlertId, RepositoryError>;
    fn insert_alert(&self, alert: Alert) -> Result<Alert, RepositoryError>;
    fn update_alert(&self, alert: Alert) -> Result<(), RepositoryError>;
    fn fetch_alert(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError>;
    /// Alerts of one hospital, newest first.
    fn alerts_for(
        &self,
        hospital: &HospitalId,
        include_resolved: bool,
    ) -> Result<Vec<Alert>, RepositoryError>;
}

/// Saved alert switches. Types without a saved row fall back to defaults upstream.
pub trait AlertConfigurationRepository: Send + Sync {
    fn configurations(&self) -> Result<Vec<AlertConfiguration>, RepositoryError>;
    fn save_configuration(&self, config: AlertConfiguration) -> Result<(), RepositoryError>;
}

/// Everything the study service needs from storage.
pub trait StudyRepository:
    HospitalRepository + PeriodRepository + AlertRepository + AlertConfigurationRepository
{
}

impl<T> StudyRepository for T where
    T: HospitalRepository + PeriodRepository + AlertRepository + AlertConfigurationRepository
{
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
