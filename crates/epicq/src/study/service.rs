use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::alerts::{
    plan_communications, plan_reconciliation, Alert, AlertAlreadyResolved, AlertConfiguration,
    AlertConfigurationSet, AlertEvaluator, AlertType, EvaluationContext, HospitalAlertState,
    NotificationDispatcher,
};
use super::completion::{HospitalCompletionScorer, HospitalFormStatus};
use super::domain::{deserialize_date, AlertId, HospitalId, PeriodId, UserId};
use super::hospital::HospitalRecord;
use super::locale::Locale;
use super::recruitment::{
    PeriodOverlapValidator, PeriodRejection, PeriodStatus, PeriodTransitionError,
    PeriodWindow, RecruitmentPeriod,
};
use super::repository::{RepositoryError, StudyRepository};
use crate::config::StudyConfig;

/// Payload for creating or editing a recruitment period.
#[derive(Debug, Clone, Deserialize)]
pub struct PeriodRequest {
    #[serde(deserialize_with = "deserialize_date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub end_date: NaiveDate,
    /// Present when editing an existing period.
    #[serde(default)]
    pub period_id: Option<PeriodId>,
    #[serde(default)]
    pub target_cases: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of an alert configuration; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertConfigurationUpdate {
    pub enabled: Option<bool>,
    pub notify_admin: Option<bool>,
    pub notify_coordinator: Option<bool>,
    pub auto_send_email: Option<bool>,
    pub threshold_value: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorStats {
    pub form_completion: u8,
    pub hospital_form_status: HospitalFormStatus,
}

/// Alerts opened and closed by one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub created: Vec<Alert>,
    pub resolved: Vec<AlertId>,
}

/// Coordinates recruitment periods, form scoring and alerting on top of storage.
///
/// Writes for one hospital are serialized so that validation and deduplication see the
/// state they are about to change.
pub struct StudyService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    validator: PeriodOverlapValidator,
    scorer: HospitalCompletionScorer,
    evaluator: AlertEvaluator,
    urgency_window: Duration,
    hospital_locks: Mutex<HashMap<HospitalId, Arc<Mutex<()>>>>,
}

impl<R, N> StudyService<R, N>
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, config: &StudyConfig) -> Self {
        Self {
            repository,
            notifier,
            validator: PeriodOverlapValidator::new(config.period_policy)
                .with_locale(config.locale),
            scorer: HospitalCompletionScorer::standard(),
            evaluator: AlertEvaluator::standard(),
            urgency_window: Duration::try_days(config.urgency_days).unwrap_or(Duration::MAX),
            hospital_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_scorer(mut self, scorer: HospitalCompletionScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_evaluator(mut self, evaluator: AlertEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn locale(&self) -> Locale {
        self.validator.locale()
    }

    fn hospital_lock(&self, id: &HospitalId) -> Arc<Mutex<()>> {
        let mut locks = self
            .hospital_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(id.clone()).or_default().clone()
    }

    fn hospital(&self, id: &HospitalId) -> Result<HospitalRecord, StudyServiceError> {
        self.repository
            .fetch_hospital(id)?
            .ok_or_else(|| StudyServiceError::HospitalNotFound(id.clone()))
    }

    fn period(
        &self,
        hospital_id: &HospitalId,
        period_id: &PeriodId,
    ) -> Result<RecruitmentPeriod, StudyServiceError> {
        self.repository
            .periods_for(hospital_id)?
            .into_iter()
            .find(|period| &period.id == period_id)
            .ok_or_else(|| StudyServiceError::PeriodNotFound(period_id.clone()))
    }

    pub fn list_periods(
        &self,
        hospital_id: &HospitalId,
    ) -> Result<Vec<RecruitmentPeriod>, StudyServiceError> {
        self.hospital(hospital_id)?;
        let mut periods = self.repository.periods_for(hospital_id)?;
        periods.sort_by_key(|period| period.period_number);
        Ok(periods)
    }

    /// Validates and persists a recruitment window, creating it when no `period_id` is given.
    pub fn save_period(
        &self,
        hospital_id: &HospitalId,
        request: PeriodRequest,
    ) -> Result<RecruitmentPeriod, StudyServiceError> {
        self.hospital(hospital_id)?;
        let lock = self.hospital_lock(hospital_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let periods = self.repository.periods_for(hospital_id)?;

        let current = match &request.period_id {
            Some(id) => {
                let period = periods
                    .iter()
                    .find(|period| &period.id == id)
                    .cloned()
                    .ok_or_else(|| StudyServiceError::PeriodNotFound(id.clone()))?;
                if period.status.is_locked() {
                    return Err(StudyServiceError::PeriodLocked(id.clone()));
                }
                Some(period)
            }
            None => None,
        };

        // cancelled windows no longer block the calendar but keep their number
        let windows: Vec<PeriodWindow> = periods
            .iter()
            .filter(|period| period.status != PeriodStatus::Cancelled)
            .map(RecruitmentPeriod::window)
            .collect();
        let number = match &current {
            Some(period) => period.period_number,
            None => periods
                .iter()
                .map(|period| period.period_number)
                .max()
                .map_or(1, |max| max + 1),
        };

        if let Err(rejection) = self.validator.check_numbered(
            number,
            request.start_date,
            request.end_date,
            &windows,
            request.period_id.as_ref(),
        ) {
            warn!(
                hospital = %hospital_id,
                period_number = number,
                reason = %rejection,
                "recruitment period rejected"
            );
            return Err(StudyServiceError::Rejected(rejection));
        }

        match current {
            Some(mut period) => {
                period.start_date = request.start_date;
                period.end_date = request.end_date;
                period.target_cases = request.target_cases;
                period.notes = request.notes;
                self.repository.update_period(period.clone())?;
                info!(hospital = %hospital_id, period = %period.id, "recruitment period updated");
                Ok(period)
            }
            None => {
                let period = RecruitmentPeriod {
                    id: self.repository.next_period_id()?,
                    hospital_id: hospital_id.clone(),
                    period_number: number,
                    start_date: request.start_date,
                    end_date: request.end_date,
                    status: PeriodStatus::Planned,
                    target_cases: request.target_cases,
                    notes: request.notes,
                };
                let stored = self.repository.insert_period(period)?;
                info!(
                    hospital = %hospital_id,
                    period = %stored.id,
                    period_number = stored.period_number,
                    "recruitment period created"
                );
                Ok(stored)
            }
        }
    }

    pub fn transition_period(
        &self,
        hospital_id: &HospitalId,
        period_id: &PeriodId,
        status: PeriodStatus,
    ) -> Result<RecruitmentPeriod, StudyServiceError> {
        let lock = self.hospital_lock(hospital_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut period = self.period(hospital_id, period_id)?;
        let previous = period.status;
        period.transition(status)?;
        self.repository.update_period(period.clone())?;
        info!(
            period = %period_id,
            from = previous.label(),
            to = status.label(),
            "recruitment period status changed"
        );
        Ok(period)
    }

    /// Removes a period unless it has been completed.
    pub fn delete_period(
        &self,
        hospital_id: &HospitalId,
        period_id: &PeriodId,
    ) -> Result<(), StudyServiceError> {
        let lock = self.hospital_lock(hospital_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let period = self.period(hospital_id, period_id)?;
        if period.status.is_locked() {
            return Err(StudyServiceError::PeriodLocked(period_id.clone()));
        }
        self.repository.delete_period(hospital_id, period_id)?;
        info!(hospital = %hospital_id, period = %period_id, "recruitment period deleted");
        Ok(())
    }

    /// Form completion block shown on the coordinator dashboard.
    pub fn coordinator_stats(
        &self,
        hospital_id: &HospitalId,
        now: DateTime<Utc>,
    ) -> Result<CoordinatorStats, StudyServiceError> {
        let hospital = self.hospital(hospital_id)?;
        let result = self.scorer.score_record(&hospital);
        let status =
            HospitalFormStatus::new(&result, hospital.basic.created_at, now, self.urgency_window);
        Ok(CoordinatorStats {
            form_completion: result.percentage,
            hospital_form_status: status,
        })
    }

    fn configuration_set(&self) -> Result<AlertConfigurationSet, StudyServiceError> {
        Ok(AlertConfigurationSet::new(
            self.repository.configurations()?,
        ))
    }

    pub fn alert_configurations(&self) -> Result<Vec<AlertConfiguration>, StudyServiceError> {
        Ok(self.configuration_set()?.all())
    }

    pub fn alert_configuration(
        &self,
        alert_type: AlertType,
    ) -> Result<AlertConfiguration, StudyServiceError> {
        Ok(self.configuration_set()?.for_type(alert_type))
    }

    pub fn update_alert_configuration(
        &self,
        alert_type: AlertType,
        update: AlertConfigurationUpdate,
    ) -> Result<AlertConfiguration, StudyServiceError> {
        let mut config = self.configuration_set()?.for_type(alert_type);

        if let Some(value) = update.threshold_value {
            let max = alert_type.max_threshold();
            if value == 0 || value > max {
                return Err(StudyServiceError::InvalidThreshold {
                    alert_type: alert_type.as_str(),
                    value,
                    max,
                });
            }
            config.threshold_value = value;
        }
        if let Some(enabled) = update.enabled {
            config.enabled = enabled;
        }
        if let Some(notify_admin) = update.notify_admin {
            config.notify_admin = notify_admin;
        }
        if let Some(notify_coordinator) = update.notify_coordinator {
            config.notify_coordinator = notify_coordinator;
        }
        if let Some(auto_send_email) = update.auto_send_email {
            config.auto_send_email = auto_send_email;
        }

        self.repository.save_configuration(config.clone())?;
        info!(
            alert_type = alert_type.as_str(),
            enabled = config.enabled,
            threshold = config.threshold_value,
            "alert configuration saved"
        );
        Ok(config)
    }

    /// Runs every enabled rule for one hospital, opening new alerts and closing cleared ones.
    pub fn evaluate_alerts(
        &self,
        hospital_id: &HospitalId,
        now: DateTime<Utc>,
    ) -> Result<EvaluationSummary, StudyServiceError> {
        let hospital = self.hospital(hospital_id)?;
        let lock = self.hospital_lock(hospital_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let periods = self.repository.periods_for(hospital_id)?;
        let completion = self.scorer.score_record(&hospital);
        let configurations = self.configuration_set()?;

        let state = HospitalAlertState {
            hospital: &hospital,
            periods: &periods,
            completion: &completion,
        };
        let context = EvaluationContext {
            now,
            locale: self.locale(),
        };
        let drafts = self.evaluator.evaluate(&state, &configurations, &context);
        debug!(hospital = %hospital_id, fired = drafts.len(), "alert rules evaluated");

        let open = self.repository.alerts_for(hospital_id, false)?;
        let evaluated = self.evaluator.evaluated_types(&configurations);
        let plan = plan_reconciliation(drafts, &open, &evaluated);

        let mut created = Vec::with_capacity(plan.to_open.len());
        for draft in plan.to_open {
            let alert = Alert::open(
                self.repository.next_alert_id()?,
                hospital_id.clone(),
                hospital.basic.project_id.clone(),
                draft,
                now,
            );
            let stored = self.repository.insert_alert(alert)?;
            info!(
                hospital = %hospital_id,
                alert = %stored.id,
                alert_type = stored.alert_type.as_str(),
                severity = stored.severity.label(),
                "alert opened"
            );
            self.notify(&stored, &configurations.for_type(stored.alert_type));
            created.push(stored);
        }

        let mut resolved = Vec::with_capacity(plan.to_resolve.len());
        for mut alert in open
            .into_iter()
            .filter(|alert| plan.to_resolve.contains(&alert.id))
        {
            alert.resolve_automatically(now);
            self.repository.update_alert(alert.clone())?;
            info!(
                hospital = %hospital_id,
                alert = %alert.id,
                alert_type = alert.alert_type.as_str(),
                "alert auto-resolved"
            );
            resolved.push(alert.id);
        }

        Ok(EvaluationSummary { created, resolved })
    }

    fn notify(&self, alert: &Alert, config: &AlertConfiguration) {
        for communication in plan_communications(alert, config) {
            let channel = communication.channel;
            if let Err(error) = self.notifier.dispatch(communication) {
                warn!(alert = %alert.id, ?channel, %error, "alert notification failed");
            }
        }
    }

    pub fn alerts(
        &self,
        hospital_id: &HospitalId,
        include_resolved: bool,
    ) -> Result<Vec<Alert>, StudyServiceError> {
        self.hospital(hospital_id)?;
        Ok(self.repository.alerts_for(hospital_id, include_resolved)?)
    }

    pub fn resolve_alert(
        &self,
        alert_id: &AlertId,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Alert, StudyServiceError> {
        let hospital_id = self
            .repository
            .fetch_alert(alert_id)?
            .ok_or_else(|| StudyServiceError::AlertNotFound(alert_id.clone()))?
            .hospital_id;
        let lock = self.hospital_lock(&hospital_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        // an evaluation may have auto-resolved it before the lock was taken
        let mut alert = self
            .repository
            .fetch_alert(alert_id)?
            .ok_or_else(|| StudyServiceError::AlertNotFound(alert_id.clone()))?;
        alert.resolve_manually(user, now)?;
        self.repository.update_alert(alert.clone())?;
        info!(alert = %alert_id, resolved_by = ?alert.resolved_by, "alert resolved");
        Ok(alert)
    }
}

/// Error raised by the study service.
#[derive(Debug, thiserror::Error)]
pub enum StudyServiceError {
    #[error(transparent)]
    Rejected(#[from] PeriodRejection),
    #[error("hospital {0} not found")]
    HospitalNotFound(HospitalId),
    #[error("recruitment period {0} not found")]
    PeriodNotFound(PeriodId),
    #[error("alert {0} not found")]
    AlertNotFound(AlertId),
    #[error("recruitment period {0} is completed and can no longer change")]
    PeriodLocked(PeriodId),
    #[error(transparent)]
    Transition(#[from] PeriodTransitionError),
    #[error(transparent)]
    AlreadyResolved(#[from] AlertAlreadyResolved),
    #[error("threshold {value} for {alert_type} must be between 1 and {max}")]
    InvalidThreshold {
        alert_type: &'static str,
        value: u32,
        max: u32,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
