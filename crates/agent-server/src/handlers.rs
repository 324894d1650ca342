//! HTTP Handlers
//!
//! The peer envelope: `POST /agent` with `{"input": ...}`, answered by
//! `{"content": ...}`. Every failure, whether of the request itself or of
//! the agent, is the same `400 Bad Request`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::state::PeerState;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRequest {
    pub input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerResponse {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type BadRequest = (StatusCode, Json<ErrorResponse>);

/// The single failure response of the envelope
pub fn bad_request() -> BadRequest {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Bad Request".into(),
            code: "BAD_REQUEST".into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Run one request through the agent
pub async fn agent_handler(
    State(state): State<PeerState>,
    payload: Result<Json<PeerRequest>, JsonRejection>,
) -> Result<Json<PeerResponse>, BadRequest> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(status = %rejection.status(), "Rejected peer request: {}", rejection.body_text());
        bad_request()
    })?;

    let content = state.agent.call_agent(&request.input).await.map_err(|e| {
        tracing::error!(agent = state.agent.name(), kind = e.kind(), "Agent error: {}", e);
        bad_request()
    })?;

    Ok(Json(PeerResponse { content }))
}

/// Any method other than POST on `/agent`
pub async fn method_rejected() -> BadRequest {
    bad_request()
}
