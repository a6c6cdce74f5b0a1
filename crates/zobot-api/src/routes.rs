//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, rate limiting
//! and all endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// CORS origins from config. An empty list allows any origin, which is what
/// an embeddable widget served from arbitrary pages needs.
fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.is_empty() {
        return AllowOrigin::any();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    AllowOrigin::list(parsed)
}

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&server.allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let public_routes = Router::new().route("/health", get(handlers::health));

    let limiter = RateLimiter::new(server.rate_limit_per_sec);

    let api_routes = Router::new()
        .route("/api/chat", post(handlers::chat))
        .route(
            "/api/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(server.upload_limit_bytes)),
        )
        .route(
            "/api/monitor/intelligence",
            post(handlers::monitor_intelligence),
        )
        .route("/api/sessions/{id}", get(handlers::get_session))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::Extension(limiter));

    public_routes
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB global limit
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
