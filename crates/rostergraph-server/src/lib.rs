//! RosterGraph Server - HTTP front-end over [`RosterService`]
//!
//! ## Routes
//!
//! | route | response |
//! |---|---|
//! | `GET /api/fetch?group=<slug>` | `{"name": slug, "size": n}` |
//! | `GET /api/groups` | `{"groups": [slug, ...]}` |
//! | `GET /api/intersect?q=a&q=b` | `{"members": [...], "intersected": n, "groups": [{"name", "size"}]}` |
//! | `GET /health` | `ok` |
//!
//! Errors are JSON `{"error": message}` with status 400 for bad requests and
//! 500 for failures inside the service.

pub mod error;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use rostergraph_core::RosterService;

pub use error::ApiError;
pub use state::AppState;

/// Create the application router with all routes and middleware.
///
/// `shutdown` is handed to ingest requests so running crawls stop between
/// pages once the server shuts down.
pub fn create_app(service: RosterService, shutdown: CancellationToken) -> Router {
    let state = AppState::new(service, shutdown);

    Router::new()
        .route("/api/fetch", get(handlers::fetch_group))
        .route("/api/groups", get(handlers::list_groups))
        .route("/api/intersect", get(handlers::intersect))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `app` on `addr` until `shutdown` is cancelled.
pub async fn run_server(
    app: Router,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("server stopped");
    Ok(())
}
