//! HTTP route handlers for the reference conversation backend.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::core::ids::ConversationId;
use crate::core::types::{Conversation, ConversationPatch, NewConversation, NewWireMessage, WireMessage};

use super::state::BackendState;

/// Handler failure: status plus plain-text reason.
type Rejection = (StatusCode, String);

/// Create the API router with all routes.
pub fn create_router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/conversations/{id}",
            axum::routing::patch(update_conversation).delete(delete_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(list_messages).post(save_message),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "convo-sync",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<(), Rejection> {
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if state.is_authorized(presented) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "missing or invalid authorization".to_string()))
    }
}

fn not_found(id: &ConversationId) -> Rejection {
    (StatusCode::NOT_FOUND, format!("conversation {id} not found"))
}

/// Listing filter.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Owner to list conversations for.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

async fn list_conversations(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Conversation>>, Rejection> {
    authorize(&state, &headers)?;
    Ok(Json(state.list_conversations(query.user_id.as_deref())))
}

async fn create_conversation(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(request): Json<NewConversation>,
) -> Result<impl IntoResponse, Rejection> {
    authorize(&state, &headers)?;
    if request.user_id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "userId is required".to_string()));
    }

    let id = state.create_conversation(&request.user_id, &request.title);
    tracing::info!(%id, owner = %request.user_id, "Created conversation");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn list_messages(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<ConversationId>,
) -> Result<Json<Vec<WireMessage>>, Rejection> {
    authorize(&state, &headers)?;
    state
        .list_messages(&id)
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn save_message(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<ConversationId>,
    Json(message): Json<NewWireMessage>,
) -> Result<impl IntoResponse, Rejection> {
    authorize(&state, &headers)?;
    let message_id = state
        .append_message(&id, message)
        .ok_or_else(|| not_found(&id))?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": message_id }))))
}

async fn update_conversation(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<ConversationId>,
    Json(patch): Json<ConversationPatch>,
) -> Result<StatusCode, Rejection> {
    authorize(&state, &headers)?;
    if state.update_conversation(&id, patch) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&id))
    }
}

async fn delete_conversation(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<ConversationId>,
) -> Result<StatusCode, Rejection> {
    authorize(&state, &headers)?;
    if state.delete_conversation(&id) {
        tracing::info!(%id, "Deleted conversation");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&id))
    }
}
