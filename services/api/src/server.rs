use crate::cli::ServeArgs;
use crate::infra::{sample_hospitals, AppState, InMemoryOutbox, InMemoryStudyStore};
use crate::routes::with_study_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use epicq::config::{AppConfig, AppEnvironment};
use epicq::error::AppError;
use epicq::study::StudyService;
use epicq::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    // production storage lives outside this process; local environments get sample data
    let store = if config.environment == AppEnvironment::Production {
        InMemoryStudyStore::default()
    } else {
        InMemoryStudyStore::seeded(sample_hospitals(Utc::now()))
    };
    info!(hospitals = store.hospital_ids().len(), "study store initialised");

    let study_service = Arc::new(StudyService::new(
        Arc::new(store),
        Arc::new(InMemoryOutbox::default()),
        &config.study,
    ));

    let app = with_study_routes(study_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        locale = config.study.locale.code(),
        "EPIC-Q study service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
