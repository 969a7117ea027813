mod routes;
mod schemas;
mod state;

use std::sync::Arc;

use axum::Router;
use log::{info, warn};
use tokio::net::TcpListener;

use crate::backend::routes::api_routes;

pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().nest("/api", api_routes()).with_state(state)
}

/// Serves the API until ctrl-c.
pub async fn serve(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting backend server on port {}", port);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
