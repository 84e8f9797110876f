use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use super::domain::{AlertConfiguration, AlertDraft, AlertSeverity, AlertType};
use crate::study::completion::CompletionResult;
use crate::study::hospital::HospitalRecord;
use crate::study::locale::Locale;
use crate::study::recruitment::{PeriodStatus, RecruitmentPeriod};

/// Snapshot of a hospital that the rules read from.
#[derive(Debug, Clone, Copy)]
pub struct HospitalAlertState<'a> {
    pub hospital: &'a HospitalRecord,
    pub periods: &'a [RecruitmentPeriod],
    pub completion: &'a CompletionResult,
}

#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext {
    pub now: DateTime<Utc>,
    pub locale: Locale,
}

/// A pure predicate deciding whether one type of alert should be raised.
pub trait AlertRule: Send + Sync {
    fn alert_type(&self) -> AlertType;

    fn evaluate(
        &self,
        state: &HospitalAlertState<'_>,
        config: &AlertConfiguration,
        context: &EvaluationContext,
    ) -> Option<AlertDraft>;
}

fn pick(locale: Locale, es: String, en: String) -> String {
    match locale {
        Locale::Es => es,
        Locale::En => en,
    }
}

fn hospital_name(state: &HospitalAlertState<'_>) -> String {
    state
        .hospital
        .basic
        .name
        .clone()
        .unwrap_or_else(|| state.hospital.basic.id.0.clone())
}

pub struct NoActivityRule;

impl AlertRule for NoActivityRule {
    fn alert_type(&self) -> AlertType {
        AlertType::NoActivity
    }

    fn evaluate(
        &self,
        state: &HospitalAlertState<'_>,
        config: &AlertConfiguration,
        context: &EvaluationContext,
    ) -> Option<AlertDraft> {
        let threshold = i64::from(config.threshold_value);
        // hospitals without cases are measured from their registration
        let reference = state
            .hospital
            .cases
            .last_case_at
            .unwrap_or(state.hospital.basic.created_at);
        let idle = context.now - reference;
        if idle <= Duration::days(threshold) {
            return None;
        }

        let days = idle.num_days();
        let name = hospital_name(state);
        Some(AlertDraft {
            alert_type: self.alert_type(),
            severity: AlertSeverity::High,
            title: pick(
                context.locale,
                format!("{name}: sin actividad"),
                format!("{name}: no activity"),
            ),
            message: pick(
                context.locale,
                format!("No se registraron casos en los últimos {days} días"),
                format!("No cases have been recorded in the last {days} days"),
            ),
            metadata: json!({
                "daysSinceLastCase": days,
                "lastCaseAt": state.hospital.cases.last_case_at,
                "thresholdDays": threshold,
            }),
        })
    }
}

pub struct LowCompletionRateRule;

impl AlertRule for LowCompletionRateRule {
    fn alert_type(&self) -> AlertType {
        AlertType::LowCompletionRate
    }

    fn evaluate(
        &self,
        state: &HospitalAlertState<'_>,
        config: &AlertConfiguration,
        context: &EvaluationContext,
    ) -> Option<AlertDraft> {
        let cases = &state.hospital.cases;
        if cases.total_cases == 0 {
            return None;
        }
        let average = cases.average_completion?;
        let threshold = f64::from(config.threshold_value);
        if average >= threshold {
            return None;
        }

        let name = hospital_name(state);
        Some(AlertDraft {
            alert_type: self.alert_type(),
            severity: AlertSeverity::Medium,
            title: pick(
                context.locale,
                format!("{name}: baja tasa de completitud"),
                format!("{name}: low completion rate"),
            ),
            message: pick(
                context.locale,
                format!(
                    "La completitud promedio de los casos es {average:.1} % (mínimo {threshold:.0} %)"
                ),
                format!(
                    "Average case completion is {average:.1}% (minimum {threshold:.0}%)"
                ),
            ),
            metadata: json!({
                "averageCompletion": average,
                "totalCases": cases.total_cases,
                "threshold": config.threshold_value,
            }),
        })
    }
}

pub struct UpcomingRecruitmentPeriodRule;

impl AlertRule for UpcomingRecruitmentPeriodRule {
    fn alert_type(&self) -> AlertType {
        AlertType::UpcomingRecruitmentPeriod
    }

    fn evaluate(
        &self,
        state: &HospitalAlertState<'_>,
        config: &AlertConfiguration,
        context: &EvaluationContext,
    ) -> Option<AlertDraft> {
        let today = context.now.date_naive();
        let threshold = i64::from(config.threshold_value);

        let (period, days) = state
            .periods
            .iter()
            .filter(|period| period.status == PeriodStatus::Planned)
            .map(|period| (period, period.days_until_start(today)))
            .filter(|(_, days)| (0..=threshold).contains(days))
            .min_by_key(|(period, days)| (*days, period.period_number))?;

        let name = hospital_name(state);
        let start = context.locale.format_date(period.start_date);
        Some(AlertDraft {
            alert_type: self.alert_type(),
            severity: AlertSeverity::Medium,
            title: pick(
                context.locale,
                format!("{name}: período de reclutamiento próximo"),
                format!("{name}: upcoming recruitment period"),
            ),
            message: pick(
                context.locale,
                format!(
                    "El período {} comienza el {start} (en {days} días)",
                    period.period_number
                ),
                format!(
                    "Period {} starts on {start} (in {days} days)",
                    period.period_number
                ),
            ),
            metadata: json!({
                "periodId": period.id,
                "periodNumber": period.period_number,
                "startDate": period.start_date,
                "daysUntilStart": days,
            }),
        })
    }
}

pub struct EthicsApprovalPendingRule;

impl EthicsApprovalPendingRule {
    /// Medium past the threshold, high past twice it, critical past three times.
    pub fn severity_for(days_pending: i64, threshold: i64) -> AlertSeverity {
        if days_pending > threshold.saturating_mul(3) {
            AlertSeverity::Critical
        } else if days_pending > threshold.saturating_mul(2) {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        }
    }
}

impl AlertRule for EthicsApprovalPendingRule {
    fn alert_type(&self) -> AlertType {
        AlertType::EthicsApprovalPending
    }

    fn evaluate(
        &self,
        state: &HospitalAlertState<'_>,
        config: &AlertConfiguration,
        context: &EvaluationContext,
    ) -> Option<AlertDraft> {
        let ethics = &state.hospital.ethics;
        if !ethics.is_pending() {
            return None;
        }
        let submitted_on = ethics.submitted_on?;
        let threshold = i64::from(config.threshold_value);
        let days_pending = (context.now.date_naive() - submitted_on).num_days();
        if days_pending <= threshold {
            return None;
        }

        let name = hospital_name(state);
        Some(AlertDraft {
            alert_type: self.alert_type(),
            severity: Self::severity_for(days_pending, threshold),
            title: pick(
                context.locale,
                format!("{name}: aprobación del comité de ética pendiente"),
                format!("{name}: ethics approval pending"),
            ),
            message: pick(
                context.locale,
                format!(
                    "La presentación al comité de ética del {} lleva {days_pending} días sin aprobación",
                    context.locale.format_date(submitted_on)
                ),
                format!(
                    "The ethics submission from {} has been pending for {days_pending} days",
                    context.locale.format_date(submitted_on)
                ),
            ),
            metadata: json!({
                "submittedOn": submitted_on,
                "daysPending": days_pending,
                "thresholdDays": threshold,
            }),
        })
    }
}

pub struct MissingDocumentationRule;

impl AlertRule for MissingDocumentationRule {
    fn alert_type(&self) -> AlertType {
        AlertType::MissingDocumentation
    }

    fn evaluate(
        &self,
        state: &HospitalAlertState<'_>,
        config: &AlertConfiguration,
        context: &EvaluationContext,
    ) -> Option<AlertDraft> {
        let completion = state.completion;
        if completion.missing_fields.is_empty() {
            return None;
        }
        let grace = Duration::days(i64::from(config.threshold_value));
        if context.now - state.hospital.basic.created_at <= grace {
            return None;
        }

        let name = hospital_name(state);
        let missing = completion.missing_fields.join(", ");
        Some(AlertDraft {
            alert_type: self.alert_type(),
            severity: AlertSeverity::Low,
            title: pick(
                context.locale,
                format!("{name}: formulario del hospital incompleto"),
                format!("{name}: hospital form incomplete"),
            ),
            message: pick(
                context.locale,
                format!(
                    "Formulario al {}. Campos faltantes: {missing}",
                    context.locale.format_percentage(completion.percentage)
                ),
                format!(
                    "Form is {} complete. Missing fields: {missing}",
                    context.locale.format_percentage(completion.percentage)
                ),
            ),
            metadata: json!({
                "missingFields": completion.missing_fields,
                "percentage": completion.percentage,
            }),
        })
    }
}
