use crate::auth::HeaderIdentity;
use crate::cli::ServeArgs;
use crate::routes::{krefia_router, ApiDeps};
use crate::soap::SoapGateway;
use axum_prometheus::PrometheusMetricLayer;
use krefia::config::AppConfig;
use krefia::error::AppError;
use krefia::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let allegro = Arc::new(config.allegro.clone());
    let gateway = Arc::new(
        SoapGateway::new(allegro.clone()).map_err(|err| AppError::Io(std::io::Error::other(err)))?,
    );
    let deps = Arc::new(ApiDeps {
        environment: config.environment,
        allegro,
        gateway,
        identity: HeaderIdentity::new(config.server.bsn_header.clone()),
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    });

    let app = krefia_router(deps).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "krefia aggregation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
