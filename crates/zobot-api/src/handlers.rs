//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its inputs via axum extractors, calls into the chat
//! engine, and returns JSON responses.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;
use zobot_chat::{ChatReply, SessionContext, Turn};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Response types
// =============================================================================

/// Response for GET /health.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub sessions: usize,
}

/// Response for POST /api/upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub ok: bool,
    pub message: String,
    pub upload_id: Uuid,
    pub bytes: usize,
}

/// Response for POST /api/monitor/intelligence.
#[derive(Debug, Serialize)]
pub struct LegacyResponse {
    pub ok: bool,
    pub reply: String,
}

/// Response for GET /api/sessions/{id}.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub lead_score: u64,
    pub context: SessionContext,
    pub history: Vec<Turn>,
    pub started_at: i64,
    pub last_message_at: i64,
}

// =============================================================================
// Chat
// =============================================================================

/// Read a required string field from a JSON object body.
fn required_str<'a>(body: &'a Value, field: &str) -> Result<&'a str, ApiError> {
    match body.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ApiError::InvalidField {
            field: field.to_string(),
            message: format!("'{}' must be a string", field),
        }),
        None => Err(ApiError::InvalidField {
            field: field.to_string(),
            message: format!("'{}' is required", field),
        }),
    }
}

/// POST /api/chat - answer one widget message.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if !body.is_object() {
        return Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }

    let message = required_str(&body, "userMessage")?;
    let session_id = required_str(&body, "sessionId")?;

    tracing::info!(session_id = %session_id, "Chat message received");

    let reply = state.engine.handle_message(session_id, message)?;
    Ok(Json(reply))
}

// =============================================================================
// Simulated and legacy endpoints
// =============================================================================

/// POST /api/upload - accept a product photo without storing it.
pub async fn upload(body: Bytes) -> Json<UploadResponse> {
    let upload_id = Uuid::new_v4();
    tracing::info!(upload_id = %upload_id, bytes = body.len(), "Upload simulated");
    Json(UploadResponse {
        ok: true,
        message: "Upload simulated".to_string(),
        upload_id,
        bytes: body.len(),
    })
}

/// POST /api/monitor/intelligence - retired endpoint kept for old widgets.
pub async fn monitor_intelligence() -> Json<LegacyResponse> {
    Json(LegacyResponse {
        ok: true,
        reply: "Please use /api/chat for the new flow.".to_string(),
    })
}

// =============================================================================
// Inspection
// =============================================================================

/// GET /api/sessions/{id} - current state of one session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .engine
        .session(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Session '{}' not found", id)))?;

    Ok(Json(SessionResponse {
        session_id: session.id,
        lead_score: session.lead_score.total(),
        context: session.context,
        history: session.history,
        started_at: session.started_at,
        last_message_at: session.last_message_at,
    }))
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        sessions: state.engine.session_count(),
    })
}
