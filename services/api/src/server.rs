use crate::cli::ServeArgs;
use crate::infra::{file_backed_service, settings_path, AppState};
use crate::routes::with_quote_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use quote_engine::config::AppConfig;
use quote_engine::error::AppError;
use quote_engine::telemetry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(
    mut args: ServeArgs,
    settings_override: Option<PathBuf>,
) -> Result<(), AppError> {
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

    let settings_file = settings_path(&config, settings_override);
    info!(path = %settings_file.display(), "loading pricing settings");
    let quote_service = Arc::new(file_backed_service(settings_file));
    // Fail fast on an unreadable settings file rather than on the first quote.
    quote_service.settings()?;

    let app = with_quote_routes(quote_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(environment = config.environment.label(), %addr, "quote configurator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
