//! Startup helpers for the reference conversation backend.

use std::process::ExitCode;
use std::sync::Arc;

use crate::server::{self, BackendState};

/// Run the reference backend until Ctrl-C (used by the `convo-sync-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    crate::init_tracing();

    tracing::info!("Starting convo-sync reference backend v{}", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(initialize());
    let port = get_port();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, port, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

/// Build the backend state, requiring an `Authorization` header when
/// `CONVO_SYNC_SERVER_AUTHORIZATION` is set.
#[must_use]
pub fn initialize() -> BackendState {
    match std::env::var("CONVO_SYNC_SERVER_AUTHORIZATION") {
        Ok(value) if !value.trim().is_empty() => {
            tracing::info!("Requests must carry the configured Authorization header");
            BackendState::new().with_required_authorization(value)
        }
        _ => BackendState::new(),
    }
}

/// Get configured server port.
#[must_use]
pub fn get_port() -> u16 {
    std::env::var("CONVO_SYNC_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(server::DEFAULT_PORT)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
