//! Reporting surface for the agent: a read-only `/health` endpoint over the
//! shared cycle counters.

pub mod error;
pub mod routes;
pub mod state;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the router. Used by [`serve_on`] and by integration tests.
pub fn build_router(state: AppState) -> Router {
    // Dashboards on other origins poll /health.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(routes::health::get_health))
        .fallback(routes::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on a listener that was already bound, so the caller can read the
/// actual port first (useful with port 0).
pub async fn serve_on(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    let port = listener.local_addr()?.port();
    tracing::info!(port, "health server listening on http://localhost:{port}/health");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
