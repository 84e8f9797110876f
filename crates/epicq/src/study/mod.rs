//! EPIC-Q study rules: recruitment windows, hospital form completion and alerting.
//!
//! The rule components are pure; [`StudyService`] composes them with the storage and
//! notification traits, and [`study_router`] exposes the service over HTTP.

pub mod alerts;
pub mod completion;
pub mod domain;
pub mod hospital;
pub mod locale;
pub mod recruitment;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{AlertId, HospitalId, PeriodId, ProjectId, UserId};
pub use hospital::{
    CaseMetrics, EthicsStatus, HospitalBasicInfo, HospitalContact, HospitalDetails,
    HospitalRecord,
};
pub use locale::Locale;
pub use repository::{
    AlertConfigurationRepository, AlertRepository, HospitalRepository, PeriodRepository,
    RepositoryError, StudyRepository,
};
pub use router::study_router;
pub use service::{
    AlertConfigurationUpdate, CoordinatorStats, EvaluationSummary, PeriodRequest, StudyService,
    StudyServiceError,
};
