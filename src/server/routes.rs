//! HTTP route handlers for the session API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::chat::conversation::{TurnOutcome, TurnRejection};
use crate::chat::core::ids::SessionId;
use crate::chat::core::session::ChatSession;
use crate::chat::core::time::iso_millis;

use super::state::AppState;

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/active",
            get(active_session).put(select_session),
        )
        .route(
            "/api/sessions/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/sessions/{id}/messages", post(submit_message))
        .fallback_service(assets)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "stoxara",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Sidebar entry for one session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session id.
    pub id: SessionId,
    /// Title as displayed, with the placeholder for empty titles.
    pub title: String,
    /// Last modification time.
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
    /// Number of messages in the transcript.
    pub message_count: usize,
}

impl From<&ChatSession> for SessionSummary {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id.clone(),
            title: session.display_title().to_string(),
            updated_at: session.updated_at,
            message_count: session.messages.len(),
        }
    }
}

/// Session list response, most recently updated first.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    /// Currently selected session id.
    pub active_id: SessionId,
    /// Session summaries.
    pub sessions: Vec<SessionSummary>,
}

/// Active selection after a change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveResponse {
    /// Currently selected session id.
    pub active_id: SessionId,
}

/// Request to change the active session.
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    /// Session to select.
    pub id: SessionId,
}

/// Request to submit a chat turn.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// The user's message.
    pub message: String,
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    let sessions = state.store.sessions_by_recent().await;
    Json(SessionListResponse {
        active_id: state.store.active_id().await,
        sessions: sessions.iter().map(SessionSummary::from).collect(),
    })
}

async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ChatSession>) {
    (StatusCode::CREATED, Json(state.store.create_session().await))
}

async fn active_session(State(state): State<Arc<AppState>>) -> Json<ChatSession> {
    Json(state.store.active_session().await)
}

async fn select_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> StatusCode {
    state.store.select_session(request.id).await;
    StatusCode::NO_CONTENT
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> ApiResult<Json<ChatSession>> {
    state
        .store
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> Json<ActiveResponse> {
    state.store.delete_session(&id).await;
    Json(ActiveResponse {
        active_id: state.store.active_id().await,
    })
}

/// Run one turn on the session and return its final state.
async fn submit_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(request): Json<MessageRequest>,
) -> ApiResult<Json<ChatSession>> {
    let session = state.store.get(&id).await.ok_or_else(|| not_found(&id))?;

    match state.controller.submit_turn(session, &request.message).await {
        TurnOutcome::Completed(session) => Ok(Json(session)),
        TurnOutcome::Ignored(TurnRejection::EmptyInput) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "message must not be empty".to_string(),
        )),
        TurnOutcome::Ignored(TurnRejection::Busy) => Err((
            StatusCode::CONFLICT,
            "a reply is still being generated".to_string(),
        )),
    }
}

fn not_found(id: &SessionId) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("session not found: {id}"))
}
