//! Rule-based hospital alerts: configuration, evaluation, deduplication and dispatch.

pub mod dispatch;
pub mod domain;
pub mod evaluator;
pub mod rules;


pub use dispatch::{
    plan_communications, Channel, Communication, NotificationDispatcher, NotificationError,
    Recipient,
};
pub use domain::{
    Alert, AlertAlreadyResolved, AlertConfiguration, AlertConfigurationSet, AlertDraft,
    AlertSeverity, AlertType,
};
pub use evaluator::{plan_reconciliation, AlertEvaluator, ReconciliationPlan};
pub use rules::{AlertRule, EvaluationContext, HospitalAlertState};
