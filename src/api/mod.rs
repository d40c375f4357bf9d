//! Read-only HTTP surface over [`EnergyFeeds`].
//!
//! Every route answers 200 with a result envelope, degraded or not; 400 is
//! reserved for queries that cannot be interpreted at all.
//!
//! - `/regions?kind=`: region catalog
//! - `/production?kind=&code=&start=&end=`: monthly production series
//! - `/reserves?kind=&code=&start=&end=`: annual proved reserves
//! - `/production/latest?kind=&code=`: most recent production reading
//! - `/top-producers?kind=&limit=`: ranked producers

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::service::EnergyFeeds;

/// Builds the axum router with all API routes.
pub fn router(feeds: Arc<EnergyFeeds>) -> Router {
    Router::new()
        .route("/regions", get(handlers::get_regions))
        .route("/production", get(handlers::get_production))
        .route("/production/latest", get(handlers::get_latest_production))
        .route("/reserves", get(handlers::get_reserves))
        .route("/top-producers", get(handlers::get_top_producers))
        .with_state(feeds)
}

/// Binds to `addr` and serves the API until the process exits.
///
/// # Errors
///
/// Returns the I/O error if the listener cannot bind or the server fails.
pub async fn serve(feeds: Arc<EnergyFeeds>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(feeds);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
