//! # polcheck-api: Policy Compliance HTTP Service
//!
//! Upload policy PDFs, keep their extracted text, and check documents
//! against every stored policy.
//!
//! ## API Surface
//!
//! | Method | Path                    | Module                 |
//! |--------|-------------------------|------------------------|
//! | GET    | `/`                     | [`routes::index`]      |
//! | POST   | `/upload_policy`        | [`routes::policies`]   |
//! | GET    | `/policies`             | [`routes::policies`]   |
//! | DELETE | `/policies/:filename`   | [`routes::policies`]   |
//! | POST   | `/check_document`       | [`routes::check`]      |
//! | GET    | `/health/liveness`      | this module            |
//! | GET    | `/health/readiness`     | this module            |
//! | GET    | `/metrics`              | this module            |
//! | GET    | `/openapi.json`         | [`openapi`]            |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! CORS is fully permissive. There is no authentication and no rate
//! limiting.

pub mod compliance;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod uploads;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Body limit for every route except `/upload_policy`, which sets its own.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics_on = state.config.metrics_enabled;

    let mut router = Router::new()
        .merge(routes::index::router())
        .merge(routes::policies::router(state.config.max_upload_bytes))
        .merge(routes::check::router())
        .merge(openapi::router())
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if metrics_on {
        router = router.route("/metrics", get(prometheus_metrics));
    }

    let mut router = router.layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT));

    if metrics_on {
        router = router
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(axum::Extension(state.metrics.clone()));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /metrics: Prometheus metrics scrape endpoint.
///
/// Refreshes the stored-policy gauge on each scrape, then encodes all
/// metrics in Prometheus text exposition format.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    state
        .metrics
        .policies_total()
        .set(state.policies.len() as f64);

    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// When a database is configured, checks that it answers. The model API is
/// not probed: a check there costs a billed request.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
