use super::state::AppState;
use crate::analysis::{ResultScores, SessionResult};
use crate::error::CaptureError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    pub muted: bool,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
    pub media_available: bool,
}

#[derive(Debug, Serialize)]
pub struct MuteResponse {
    pub session_id: String,
    pub muted: bool,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub result: SessionResult,
    pub scores: ResultScores,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

fn capture_error_response(err: CaptureError) -> Response {
    let status = match &err {
        CaptureError::InvalidState { .. } => StatusCode::CONFLICT,
        CaptureError::Upload(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn result_response(result: SessionResult) -> Response {
    let scores = ResultScores::compute(&result);
    (StatusCode::OK, Json(ResultsResponse { result, scores })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Begin recording, timing and frame sampling
pub async fn start_session(State(state): State<AppState>) -> Response {
    let controller = &state.controller;

    match controller.start().await {
        Ok(()) => {
            info!("Recording started for session: {}", controller.session_id());
            (
                StatusCode::OK,
                Json(StartSessionResponse {
                    session_id: controller.session_id().to_string(),
                    status: controller.state().to_string(),
                    media_available: controller.media_available(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start session: {}", e);
            capture_error_response(e)
        }
    }
}

/// POST /session/stop
/// Finalize the session and return the merged result
pub async fn stop_session(State(state): State<AppState>) -> Response {
    match state.controller.stop().await {
        Ok(result) => result_response(result),
        Err(e) => {
            error!("Failed to stop session: {}", e);
            capture_error_response(e)
        }
    }
}

/// POST /session/retry
/// Re-send the kept recording after a failed upload
pub async fn retry_upload(State(state): State<AppState>) -> Response {
    match state.controller.retry_upload().await {
        Ok(result) => result_response(result),
        Err(e) => {
            error!("Retry failed: {}", e);
            capture_error_response(e)
        }
    }
}

/// POST /session/mute
pub async fn set_muted(
    State(state): State<AppState>,
    Json(req): Json<MuteRequest>,
) -> impl IntoResponse {
    state.controller.set_muted(req.muted);
    (
        StatusCode::OK,
        Json(MuteResponse {
            session_id: state.controller.session_id().to_string(),
            muted: state.controller.is_muted(),
        }),
    )
}

/// GET /session/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.status()))
}

/// GET /results
/// Read the handoff slot written when the last session finished
pub async fn get_results(State(state): State<AppState>) -> Response {
    match state.store.load() {
        Ok(Some(result)) => result_response(result),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No session results available".to_string()),
        Err(e) => {
            error!("Failed to read results: {:#}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read results: {}", e),
            )
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
