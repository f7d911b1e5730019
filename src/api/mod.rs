//! HTTP JSON API
//!
//! Route surface:
//!
//! - POST /session            — create a session for an identity label
//! - POST /chat               — run a chat turn (persist, orchestrate, reply)
//! - GET  /history/{id}       — ordered message history for a session
//! - POST /admin/login        — obtain an admin bearer token
//! - GET  /sessions           — all sessions with counts (bearer-gated)
//! - DELETE /sessions/{id}    — cascade-delete a session (bearer-gated)
//! - GET  /search             — filtered session+message search (bearer-gated)
//! - GET  /models             — static provider catalog

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth::AdminGate;
use crate::db::search::{LogSearch, SearchFilter, SearchRow};
use crate::db::sessions::{MessageRecord, SessionRecord, SessionRepository, SessionSummary};
use crate::error::ServiceError;
use crate::llm::catalog::AVAILABLE_MODELS;
use crate::llm::orchestrator::ChatService;

type ApiResult<T> = std::result::Result<T, ServiceError>;

/// Shared state for all request handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRepository,
    pub search: LogSearch,
    pub gate: Arc<AdminGate>,
    pub chat: Arc<ChatService>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/session", post(create_session))
        .route("/chat", post(chat))
        .route("/history/:session_id", get(history))
        .route("/admin/login", post(admin_login))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:id", delete(delete_session))
        .route("/search", get(search))
        .route("/models", get(models))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServiceError::CapacityExceeded => {
                (StatusCode::FORBIDDEN, "CapacityExceeded".to_string())
            }
            ServiceError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            ServiceError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized — admin login required".to_string(),
            ),
            ServiceError::NotFound(what) => {
                (StatusCode::NOT_FOUND, format!("{what} not found"))
            }
            ServiceError::Exhausted => {
                tracing::error!(error = %self, "Chat turn failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process message".to_string(),
                )
            }
            ServiceError::Database(e) => {
                tracing::error!(error = %e, "Unexpected database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ─── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest {
    identity_label: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    id: String,
    identity_label: String,
    created_at: i64,
}

impl From<SessionRecord> for SessionResponse {
    fn from(s: SessionRecord) -> Self {
        Self {
            id: s.id,
            identity_label: s.user_name,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    session_id: Option<String>,
    message: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
    id: i64,
    role: String,
    content: String,
    created_at: i64,
}

impl From<&MessageRecord> for MessageResponse {
    fn from(m: &MessageRecord) -> Self {
        Self {
            id: m.id,
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummaryResponse {
    id: String,
    identity_label: String,
    created_at: i64,
    message_count: i64,
}

impl From<SessionSummary> for SessionSummaryResponse {
    fn from(s: SessionSummary) -> Self {
        Self {
            id: s.id,
            identity_label: s.user_name,
            created_at: s.created_at,
            message_count: s.message_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery {
    identity: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRowResponse {
    id: String,
    identity_label: String,
    created_at: i64,
    message_count: i64,
    messages: Vec<MessageResponse>,
}

impl From<SearchRow> for SearchRowResponse {
    fn from(row: SearchRow) -> Self {
        Self {
            id: row.id,
            identity_label: row.user_name,
            created_at: row.created_at,
            message_count: row.message_count,
            messages: row.messages.iter().map(MessageResponse::from).collect(),
        }
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let label = req
        .identity_label
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ServiceError::Validation("identityLabel is required".to_string()))?;

    let session = state.sessions.create(label).await?;
    tracing::info!(session_id = %session.id, label, "New session created");

    Ok((StatusCode::CREATED, Json(session.into())))
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let (session_id, message) = match (&req.session_id, &req.message) {
        (Some(s), Some(m)) if !s.is_empty() && !m.is_empty() => (s, m),
        _ => {
            return Err(ServiceError::Validation(
                "sessionId and message are required".to_string(),
            ))
        }
    };

    let outcome = state
        .chat
        .chat_turn(session_id, message, req.model.as_deref())
        .await?;

    Ok(Json(ChatResponse {
        response: outcome.reply,
        model: outcome.model,
    }))
}

async fn history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let messages = state.sessions.history(&session_id).await?;
    Ok(Json(messages.iter().map(MessageResponse::from).collect()))
}

async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let (username, password) = match (&req.username, &req.password) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            return Err(ServiceError::Validation(
                "username and password are required".to_string(),
            ))
        }
    };

    let token = state.gate.login(username, password)?;
    Ok(Json(json!({ "token": token })))
}

async fn list_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<SessionSummaryResponse>>> {
    authorize(&state, &headers)?;

    let sessions = state.sessions.list_all().await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&state, &headers)?;

    if state.sessions.delete(&id).await? {
        tracing::info!(session_id = %id, "Admin deleted session");
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ServiceError::NotFound("Session"))
    }
}

async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SearchRowResponse>>> {
    authorize(&state, &headers)?;

    let filter = SearchFilter {
        user_name: non_empty(query.identity),
        content: non_empty(query.content),
        date_from: query.date_from.as_deref().map(parse_date_bound).transpose()?,
        date_to: query.date_to.as_deref().map(parse_date_bound).transpose()?,
    };

    let rows = state.search.search(&filter).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn models() -> impl IntoResponse {
    Json(AVAILABLE_MODELS)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    state.gate.authorize(bearer)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a date bound as RFC 3339 or a bare `YYYY-MM-DD` (taken as UTC
/// midnight, matching how the original store compared date-only inputs).
fn parse_date_bound(s: &str) -> ApiResult<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp());
    }
    Err(ServiceError::Validation(format!("Invalid date: {s}")))
}
