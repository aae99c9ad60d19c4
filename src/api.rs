//! Status Ingestion API
//!
//! HTTP surface in front of the status store. Watchers post reports here; operators can
//! read back what is pending. Accepting a report only means it is recorded for a future
//! reconciliation, never that it has been published.

use crate::store::StatusStore;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod handlers;
mod middleware;

pub use handlers::StatusView;
pub use middleware::REQUEST_ID_HEADER;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<StatusStore>,
    pub version: String,
    pub commit: String,
}

impl ApiState {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self {
            store,
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("STATUS_COLLECTOR_COMMIT")
                .unwrap_or("none")
                .to_string(),
        }
    }
}

/// Build the router with every route and middleware registered.
pub fn router(state: ApiState) -> Router {
    let routes = Router::new()
        .route(
            "/api/v1/status",
            post(handlers::post_status).get(handlers::get_status),
        )
        .route("/api/v1/status/:cluster", get(handlers::get_status_by_cluster))
        .route("/healthz", get(handlers::healthz))
        .route("/version", get(handlers::version))
        .with_state(state);

    middleware::wrap(routes)
}

/// Serve `router` on `listener` until `cancel` fires, then drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Ingestion API listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    info!("Ingestion API stopped");
    Ok(())
}
