//! HTTP router assembly.

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use corvid_auth::OAuthState;

/// Builds the full application router: OAuth endpoints plus health check,
/// wrapped in request tracing.
#[must_use]
pub fn build(state: OAuthState) -> Router {
    corvid_auth::router(state)
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
