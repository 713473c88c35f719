use crate::auth::IdentityResolver;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use krefia::allegro::{AllegroClient, AllegroGateway};
use krefia::config::{AllegroConfig, AppEnvironment};
use krefia::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Request-independent wiring shared by all handlers. The gateway carries no
/// per-user state; the per-request session lives in the `AllegroClient`
/// built inside the handler.
pub(crate) struct ApiDeps<G, I> {
    pub(crate) environment: AppEnvironment,
    pub(crate) allegro: Arc<AllegroConfig>,
    pub(crate) gateway: Arc<G>,
    pub(crate) identity: I,
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn krefia_router<G, I>(deps: Arc<ApiDeps<G, I>>) -> axum::Router
where
    G: AllegroGateway + 'static,
    I: IdentityResolver + 'static,
{
    axum::Router::new()
        .route("/krefia/all", axum::routing::get(krefia_all::<G, I>))
        .route("/", axum::routing::get(health_check::<G, I>))
        .route("/status/health", axum::routing::get(health_check::<G, I>))
        .route("/ready", axum::routing::get(readiness_endpoint::<G, I>))
        .route("/metrics", axum::routing::get(metrics_endpoint::<G, I>))
        .layer(Extension(deps))
}

pub(crate) async fn krefia_all<G, I>(
    Extension(deps): Extension<Arc<ApiDeps<G, I>>>,
    headers: HeaderMap,
) -> Response
where
    G: AllegroGateway + 'static,
    I: IdentityResolver + 'static,
{
    let bsn = match deps.identity.resolve(&headers) {
        Ok(bsn) => bsn,
        Err(error) => return error_response(&deps, error),
    };

    let mut client = AllegroClient::new(deps.gateway.clone(), deps.allegro.clone());
    match client.get_all(&bsn).await {
        Ok(content) => (
            StatusCode::OK,
            Json(json!({ "status": "OK", "content": content })),
        )
            .into_response(),
        Err(error) => error_response(&deps, AppError::from(error)),
    }
}

/// Generic message in production, the uncensored one in development.
fn error_response<G, I>(deps: &ApiDeps<G, I>, error: AppError) -> Response {
    tracing::error!(%error, "request failed");

    let message = if deps.environment.is_development() {
        error.to_string()
    } else {
        error.public_message().to_string()
    };

    (
        error.status_code(),
        Json(json!({ "status": "ERROR", "message": message })),
    )
        .into_response()
}

pub(crate) async fn health_check<G, I>(
    Extension(_deps): Extension<Arc<ApiDeps<G, I>>>,
) -> Json<serde_json::Value>
where
    G: AllegroGateway + 'static,
    I: IdentityResolver + 'static,
{
    Json(json!({
        "status": "OK",
        "content": {
            "gitSha": std::env::var("MA_GIT_SHA").unwrap_or_else(|_| "-1".to_string()),
            "buildId": std::env::var("MA_BUILD_ID").unwrap_or_else(|_| "-1".to_string()),
            "otapEnv": std::env::var("MA_OTAP_ENV").ok(),
        }
    }))
}

pub(crate) async fn readiness_endpoint<G, I>(
    Extension(deps): Extension<Arc<ApiDeps<G, I>>>,
) -> impl IntoResponse
where
    G: AllegroGateway + 'static,
    I: IdentityResolver + 'static,
{
    let ready = deps.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint<G, I>(
    Extension(deps): Extension<Arc<ApiDeps<G, I>>>,
) -> impl IntoResponse
where
    G: AllegroGateway + 'static,
    I: IdentityResolver + 'static,
{
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        deps.metrics.render(),
    )
}
