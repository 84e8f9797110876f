use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::alerts::{AlertType, NotificationDispatcher};
use super::domain::{AlertId, HospitalId, PeriodId, UserId};
use super::locale::Locale;
use super::recruitment::PeriodStatus;
use super::repository::{RepositoryError, StudyRepository};
use super::service::{AlertConfigurationUpdate, PeriodRequest, StudyService, StudyServiceError};

/// Router builder exposing recruitment, dashboard and alerting endpoints.
pub fn study_router<R, N>(service: Arc<StudyService<R, N>>) -> Router
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/hospitals/:hospital_id/recruitment-periods",
            get(list_periods_handler::<R, N>).put(save_period_handler::<R, N>),
        )
        .route(
            "/api/v1/hospitals/:hospital_id/recruitment-periods/:period_id",
            delete(delete_period_handler::<R, N>),
        )
        .route(
            "/api/v1/hospitals/:hospital_id/recruitment-periods/:period_id/status",
            post(transition_period_handler::<R, N>),
        )
        .route(
            "/api/v1/hospitals/:hospital_id/alerts/evaluate",
            post(evaluate_alerts_handler::<R, N>),
        )
        .route(
            "/api/v1/coordinator/stats",
            get(coordinator_stats_handler::<R, N>),
        )
        .route(
            "/api/v1/alert-configurations",
            get(list_configurations_handler::<R, N>),
        )
        .route(
            "/api/v1/alert-configurations/:alert_type",
            get(get_configuration_handler::<R, N>).put(update_configuration_handler::<R, N>),
        )
        .route("/api/v1/alerts", get(list_alerts_handler::<R, N>))
        .route(
            "/api/v1/alerts/:alert_id/resolve",
            post(resolve_alert_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChange {
    pub(crate) status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HospitalQuery {
    pub(crate) hospital_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlertQuery {
    pub(crate) hospital_id: String,
    #[serde(default)]
    pub(crate) include_resolved: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveRequest {
    pub(crate) user_id: String,
}

fn error_payload(status: StatusCode, message: String) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}

/// Unwraps a JSON body, answering malformed payloads with a 400 in the usual error shape.
fn json_body<T>(payload: Result<axum::Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|axum::Json(body)| body)
        .map_err(|rejection| error_payload(StatusCode::BAD_REQUEST, rejection.body_text()))
}

/// Maps service failures onto HTTP status codes; rejections are rendered in `locale`.
pub(crate) fn error_response(error: StudyServiceError, locale: Locale) -> Response {
    match &error {
        StudyServiceError::Rejected(rejection) => {
            error_payload(StatusCode::BAD_REQUEST, rejection.message(locale))
        }
        StudyServiceError::InvalidThreshold { .. } => {
            error_payload(StatusCode::BAD_REQUEST, error.to_string())
        }
        StudyServiceError::HospitalNotFound(_)
        | StudyServiceError::PeriodNotFound(_)
        | StudyServiceError::AlertNotFound(_)
        | StudyServiceError::Repository(RepositoryError::NotFound) => {
            error_payload(StatusCode::NOT_FOUND, error.to_string())
        }
        StudyServiceError::PeriodLocked(_)
        | StudyServiceError::Transition(_)
        | StudyServiceError::AlreadyResolved(_)
        | StudyServiceError::Repository(RepositoryError::Conflict) => {
            error_payload(StatusCode::CONFLICT, error.to_string())
        }
        StudyServiceError::Repository(RepositoryError::Unavailable(_)) => {
            error_payload(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

fn unknown_alert_type(raw: &str) -> Response {
    error_payload(StatusCode::NOT_FOUND, format!("unknown alert type '{raw}'"))
}

pub(crate) async fn list_periods_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Path(hospital_id): Path<String>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.list_periods(&HospitalId(hospital_id)) {
        Ok(periods) => (StatusCode::OK, axum::Json(periods)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn save_period_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Path(hospital_id): Path<String>,
    payload: Result<axum::Json<PeriodRequest>, JsonRejection>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let status = if request.period_id.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    match service.save_period(&HospitalId(hospital_id), request) {
        Ok(period) => (status, axum::Json(period)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn transition_period_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Path((hospital_id, period_id)): Path<(String, String)>,
    payload: Result<axum::Json<StatusChange>, JsonRejection>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let change = match json_body(payload) {
        Ok(change) => change,
        Err(response) => return response,
    };
    let Some(status) = PeriodStatus::parse(&change.status) else {
        return error_payload(
            StatusCode::BAD_REQUEST,
            format!("unknown period status '{}'", change.status),
        );
    };
    match service.transition_period(&HospitalId(hospital_id), &PeriodId(period_id), status) {
        Ok(period) => (StatusCode::OK, axum::Json(period)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn delete_period_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Path((hospital_id, period_id)): Path<(String, String)>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.delete_period(&HospitalId(hospital_id), &PeriodId(period_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn coordinator_stats_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Query(query): Query<HospitalQuery>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.coordinator_stats(&HospitalId(query.hospital_id), Utc::now()) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn list_configurations_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.alert_configurations() {
        Ok(configurations) => (StatusCode::OK, axum::Json(configurations)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn get_configuration_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Path(alert_type): Path<String>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some(kind) = AlertType::parse(&alert_type) else {
        return unknown_alert_type(&alert_type);
    };
    match service.alert_configuration(kind) {
        Ok(config) => (StatusCode::OK, axum::Json(config)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn update_configuration_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Path(alert_type): Path<String>,
    payload: Result<axum::Json<AlertConfigurationUpdate>, JsonRejection>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let update = match json_body(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };
    let Some(kind) = AlertType::parse(&alert_type) else {
        return unknown_alert_type(&alert_type);
    };
    match service.update_alert_configuration(kind, update) {
        Ok(config) => (StatusCode::OK, axum::Json(config)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn evaluate_alerts_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Path(hospital_id): Path<String>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.evaluate_alerts(&HospitalId(hospital_id), Utc::now()) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn list_alerts_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Query(query): Query<AlertQuery>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.alerts(&HospitalId(query.hospital_id), query.include_resolved) {
        Ok(alerts) => (StatusCode::OK, axum::Json(alerts)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}

pub(crate) async fn resolve_alert_handler<R, N>(
    State(service): State<Arc<StudyService<R, N>>>,
    Path(alert_id): Path<String>,
    payload: Result<axum::Json<ResolveRequest>, JsonRejection>,
) -> Response
where
    R: StudyRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match service.resolve_alert(&AlertId(alert_id), UserId(request.user_id), Utc::now()) {
        Ok(alert) => (StatusCode::OK, axum::Json(alert)).into_response(),
        Err(error) => error_response(error, service.locale()),
    }
}
