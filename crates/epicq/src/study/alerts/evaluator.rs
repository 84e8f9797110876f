use std::collections::BTreeSet;

use super::domain::{Alert, AlertConfigurationSet, AlertDraft, AlertType};
use super::rules::{
    AlertRule, EthicsApprovalPendingRule, EvaluationContext, HospitalAlertState,
    LowCompletionRateRule, MissingDocumentationRule, NoActivityRule,
    UpcomingRecruitmentPeriodRule,
};
use crate::study::domain::AlertId;

/// Runs the registered rules against a hospital snapshot.
pub struct AlertEvaluator {
    rules: Vec<Box<dyn AlertRule>>,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::standard()
    }
}

impl AlertEvaluator {
    pub fn standard() -> Self {
        Self {
            rules: vec![
                Box::new(NoActivityRule),
                Box::new(LowCompletionRateRule),
                Box::new(UpcomingRecruitmentPeriodRule),
                Box::new(EthicsApprovalPendingRule),
                Box::new(MissingDocumentationRule),
            ],
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn AlertRule>>) -> Self {
        Self { rules }
    }

    /// Drafts for every enabled rule that fired. Disabled types are skipped entirely.
    pub fn evaluate(
        &self,
        state: &HospitalAlertState<'_>,
        configurations: &AlertConfigurationSet,
        context: &EvaluationContext,
    ) -> Vec<AlertDraft> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let config = configurations.for_type(rule.alert_type());
                if !config.enabled {
                    return None;
                }
                rule.evaluate(state, &config, context)
            })
            .collect()
    }

    /// Types whose rules actually ran under the given configurations.
    pub fn evaluated_types(&self, configurations: &AlertConfigurationSet) -> BTreeSet<AlertType> {
        self.rules
            .iter()
            .map(|rule| rule.alert_type())
            .filter(|alert_type| configurations.is_enabled(*alert_type))
            .collect()
    }
}

/// What has to change in storage after an evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconciliationPlan {
    pub to_open: Vec<AlertDraft>,
    pub to_resolve: Vec<AlertId>,
}

/// Keeps at most one unresolved alert per (hospital, type) and closes alerts whose
/// condition cleared. `open_alerts` must all belong to the evaluated hospital.
pub fn plan_reconciliation(
    drafts: Vec<AlertDraft>,
    open_alerts: &[Alert],
    evaluated_types: &BTreeSet<AlertType>,
) -> ReconciliationPlan {
    let open_types: BTreeSet<AlertType> = open_alerts
        .iter()
        .filter(|alert| !alert.is_resolved)
        .map(|alert| alert.alert_type)
        .collect();
    let firing_types: BTreeSet<AlertType> = drafts.iter().map(|draft| draft.alert_type).collect();

    let mut seen = BTreeSet::new();
    let to_open = drafts
        .into_iter()
        .filter(|draft| !open_types.contains(&draft.alert_type))
        .filter(|draft| seen.insert(draft.alert_type))
        .collect();

    let to_resolve = open_alerts
        .iter()
        .filter(|alert| !alert.is_resolved)
        .filter(|alert| evaluated_types.contains(&alert.alert_type))
        .filter(|alert| !firing_types.contains(&alert.alert_type))
        .map(|alert| alert.id.clone())
        .collect();

    ReconciliationPlan {
        to_open,
        to_resolve,
    }
}
