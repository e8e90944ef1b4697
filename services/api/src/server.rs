use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicationRepository, InMemoryCatalog, InMemoryNotifier};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use visa_tracker::config::AppConfig;
use visa_tracker::error::AppError;
use visa_tracker::telemetry;
use visa_tracker::workflows::visa::applications::VisaApplicationService;

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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let catalog = Arc::new(InMemoryCatalog::seeded(Utc::now().date_naive()));
    let notifier = Arc::new(InMemoryNotifier::default());
    let application_service = Arc::new(VisaApplicationService::new(
        repository.clone(),
        catalog,
        notifier,
    ));

    let app = with_application_routes(application_service)
        .layer(Extension(repository))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "visa tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}
