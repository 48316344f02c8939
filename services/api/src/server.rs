use crate::cli::ServeArgs;
use crate::infra::{build_assistant, AppState, InMemorySessionRepository};
use crate::routes::with_assistant_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use job_assistant::config::AppConfig;
use job_assistant::error::AppError;
use job_assistant::telemetry;
use std::sync::atomic::Ordering;
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
    if let Some(postings) = args.postings.take() {
        config.assistant.postings_csv = Some(postings);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let sessions = Arc::new(InMemorySessionRepository::default());
    let assistant = Arc::new(build_assistant(&config, sessions)?);

    let app = with_assistant_routes(assistant)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "job search assistant ready");

    axum::serve(listener, app).await?;
    Ok(())
}
