//! In-memory reference backend for the conversation persistence client.
//!
//! Serves the JSON contract the client speaks, at the default endpoint paths:
//!
//! | Method | Path | Reply |
//! |---|---|---|
//! | `GET` | `/conversations?userId=` | owner's conversations, newest activity first |
//! | `POST` | `/conversations` | `201 {"id"}`; body `{userId, title}` |
//! | `PATCH` | `/conversations/{id}` | `204`; title replaced, metadata merged |
//! | `DELETE` | `/conversations/{id}` | `204` |
//! | `GET` | `/conversations/{id}/messages` | messages in insertion order |
//! | `POST` | `/conversations/{id}/messages` | `201 {"id"}`; refreshes preview and count |
//! | `GET` | `/health` | service name and version |
//!
//! Unknown conversation ids answer `404`. With a required `Authorization`
//! value configured, any other value answers `401`. Nothing is persisted
//! across restarts.

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::BackendState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Routes plus the permissive CORS and request tracing layers.
pub fn app(state: Arc<BackendState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve the backend on `port` until the process exits.
///
/// # Errors
/// Returns an error if the port cannot be bound or serving fails.
pub async fn run_server(state: Arc<BackendState>, port: u16) -> anyhow::Result<()> {
    run_server_with_shutdown(state, port, std::future::pending()).await
}

/// Serve the backend on `port`, draining connections once `shutdown_signal`
/// completes.
///
/// # Errors
/// Returns an error if the port cannot be bound or serving fails.
pub async fn run_server_with_shutdown<F>(
    state: Arc<BackendState>,
    port: u16,
    shutdown_signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Conversation backend listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    tracing::info!("Conversation backend stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_app_answers_cors_preflight() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/conversations")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .expect("request");

        let response = app(Arc::new(BackendState::new()))
            .oneshot(request)
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_server() {
        let result = run_server_with_shutdown(Arc::new(BackendState::new()), 0, async {}).await;
        assert!(result.is_ok());
    }
}
