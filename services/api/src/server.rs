use crate::cli::ServeArgs;
use crate::infra::{
    apply_integration_overrides, build_classifier, AppState, InMemorySessionRepository,
};
use crate::routes::with_screening_routes;
use aq_screening::config::AppConfig;
use aq_screening::error::AppError;
use aq_screening::telemetry;
use aq_screening::workflows::screening::{build_sink, classifier, ScreeningService};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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
    apply_integration_overrides(&mut config, &args.integrations)?;

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let classifier = build_classifier(&config)?;
    if let Some(gateway) = &classifier {
        classifier::check_health(gateway.as_ref()).await;
    } else {
        info!("classifier disabled; reports will carry the score only");
    }
    let sink = build_sink(&config.notification)?;
    info!(channel = sink.channel(), "notification channel selected");

    let repository = Arc::new(InMemorySessionRepository::default());
    info!(
        capacity = config.sessions.capacity,
        idle_ttl_secs = config.sessions.idle_ttl.as_secs(),
        "session retention configured"
    );
    let screening_service = Arc::new(ScreeningService::new(
        repository,
        classifier,
        sink,
        config.notification.clone(),
    )
    .with_session_limits(config.sessions));

    let app = with_screening_routes(screening_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "aq-10 screening service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
