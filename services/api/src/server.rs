use crate::cli::ServeArgs;
use crate::infra::{AppState, Backend};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use groundcheck::config::AppConfig;
use groundcheck::error::AppError;
use groundcheck::reconciliation::reset_admin;
use groundcheck::router::ApiState;
use groundcheck::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let backend = Backend::open(&config).await?;
    if let (Some(email), Some(password)) = (args.admin_email.take(), args.admin_password.take()) {
        reset_admin(
            backend.stores.officers.as_ref(),
            backend.scheme.as_ref(),
            "Administrator",
            &email,
            &password,
        )
        .await?;
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let api_state = ApiState::new(
        &backend.stores,
        backend.auth_service(&config),
        backend.clock.clone(),
    );

    let app = with_service_routes(api_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, ?config.store, %addr, "groundcheck api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
