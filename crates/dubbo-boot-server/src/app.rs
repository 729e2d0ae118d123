use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dubbo_boot_core::{DubboHealthIndicator, ExportedService, Health, HealthStatus};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
pub struct AppState {
    indicator: DubboHealthIndicator,
    interfaces: Arc<HashSet<String>>,
}

impl AppState {
    pub fn new(indicator: DubboHealthIndicator, exported: &[ExportedService]) -> Self {
        Self {
            indicator,
            interfaces: Arc::new(exported.iter().map(|s| s.interface.clone()).collect()),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health_check, echo),
    components(schemas(Health, HealthStatus))
)]
struct ApiDoc;

/// API doc with the health path moved under the management context path.
pub fn api_doc(context_path: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if let Some(item) = doc.paths.paths.remove("/health") {
        doc.paths.paths.insert(format!("{context_path}/health"), item);
    }
    doc
}

/// Provider-side routes plus the API docs.
pub fn rpc_router(state: AppState, context_path: &str) -> Router {
    Router::new()
        .route("/rpc/:interface/echo", post(echo))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc(context_path)))
        .layer(TraceLayer::new_for_http())
}

/// Health and metrics, mounted under the management context path.
pub fn management_router(
    state: AppState,
    context_path: &str,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let mut router = Router::new().route(&format!("{context_path}/health"), get(health_check));
    if let Some(handle) = metrics {
        router = router.route(
            &format!("{context_path}/metrics"),
            get(move || {
                let rendered = handle.render();
                async move { rendered }
            }),
        );
    }
    router.with_state(state).layer(TraceLayer::new_for_http())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "All remote references answered", body = Health),
        (status = 503, description = "A remote reference failed its echo call", body = Health)
    )
)]
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.indicator.health().await;
    let (code, label) = match health.status {
        HealthStatus::Up => (StatusCode::OK, "UP"),
        HealthStatus::Down => (StatusCode::SERVICE_UNAVAILABLE, "DOWN"),
    };
    metrics::counter!("dubbo_health_checks_total", "status" => label).increment(1);
    (code, Json(health))
}

#[utoipa::path(
    post,
    path = "/rpc/{interface}/echo",
    request_body = String,
    responses(
        (status = 200, description = "Payload echoed back", body = String),
        (status = 404, description = "Interface is not exported here")
    ),
    params(("interface" = String, Path, description = "Exported interface name"))
)]
async fn echo(
    State(state): State<AppState>,
    Path(interface): Path<String>,
    body: String,
) -> Response {
    if state.interfaces.contains(&interface) {
        (StatusCode::OK, body).into_response()
    } else {
        (StatusCode::NOT_FOUND, "No provider for interface").into_response()
    }
}
