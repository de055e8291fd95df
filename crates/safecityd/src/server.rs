use axum::serve;
use tokio::net::TcpListener;

use crate::error::DaemonError;
use crate::routes::router;
use crate::state::AppState;

/// Serve until ctrl-c. In-flight requests finish before returning.
pub async fn run_server(bind_addr: &str, state: AppState) -> Result<(), DaemonError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|source| DaemonError::Bind {
            addr: bind_addr.to_string(),
            source,
        })?;
    tracing::info!(bind = bind_addr, "safecityd listening");
    serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| DaemonError::Serve { source })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
