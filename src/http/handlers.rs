use super::state::{ActiveSession, AppState, BridgeHandle};
use crate::error::RecorderError;
use crate::nats::{spawn_bridge, NatsNotifier};
use crate::notify::Notifier;
use crate::session::{RecordingArtifact, RecordingSession, SessionConfig};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartRecordingRequest {
    /// Optional meeting ID (if not provided, generate UUID)
    pub meeting_id: Option<String>,

    /// Checkpoint interval override in seconds
    pub checkpoint_interval_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub meeting_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub meeting_id: String,
    pub status: String,
    pub message: String,
    pub artifact: Option<RecordingArtifact>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /meetings/record/start
/// Start a new recording session
pub async fn start_recording(
    State(state): State<AppState>,
    Json(req): Json<StartRecordingRequest>,
) -> impl IntoResponse {
    // Generate or use provided meeting ID
    let meeting_id = req
        .meeting_id
        .unwrap_or_else(|| format!("meeting-{}", uuid::Uuid::new_v4()));

    info!("Starting recording for meeting: {}", meeting_id);

    // Hold the registry lock across the check and the insert so two
    // concurrent starts for the same meeting cannot both win.
    let mut sessions = state.sessions.write().await;
    if sessions.contains_key(&meeting_id) {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Meeting {} is already recording", meeting_id),
            }),
        )
            .into_response();
    }

    let mut config: SessionConfig = state.recording.session_config(meeting_id.clone());
    if let Some(secs) = req.checkpoint_interval_secs {
        config.checkpoint_interval = Duration::from_secs(secs);
    }

    let notifier: Arc<dyn Notifier> = match &state.nats {
        Some(nats) => Arc::new(NatsNotifier::new(nats.clone())),
        None => Arc::new(crate::notify::LogNotifier),
    };

    let session = match RecordingSession::with_notifier(config, notifier) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to create session: {}", e),
                }),
            )
                .into_response();
        }
    };

    if let Err(e) = session.start().await {
        error!("Failed to start recording: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to start recording: {}", e),
            }),
        )
            .into_response();
    }

    let bridge = state.nats.as_ref().map(|nats| {
        let (shutdown, rx) = watch::channel(false);
        let task = spawn_bridge(nats, Arc::clone(&session), rx);
        BridgeHandle::new(shutdown, task)
    });

    sessions.insert(meeting_id.clone(), ActiveSession { session, bridge });

    info!("Recording started successfully for meeting: {}", meeting_id);

    (
        StatusCode::OK,
        Json(StartRecordingResponse {
            meeting_id: meeting_id.clone(),
            status: "recording".to_string(),
            message: format!("Recording started for meeting {}", meeting_id),
        }),
    )
        .into_response()
}

/// POST /meetings/record/stop/:meeting_id
/// Stop recording, render the final mix, and report the artifact
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> impl IntoResponse {
    info!("Stopping recording for meeting: {}", meeting_id);

    // Find and remove session
    let active = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&meeting_id)
    };

    let Some(active) = active else {
        error!("Meeting {} not found", meeting_id);
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Meeting {} not found", meeting_id),
            }),
        )
            .into_response();
    };

    if let Some(bridge) = active.bridge {
        bridge.stop().await;
    }

    match active.session.stop().await {
        Ok(artifact) => {
            info!("Recording stopped successfully for meeting: {}", meeting_id);
            (
                StatusCode::OK,
                Json(StopRecordingResponse {
                    meeting_id,
                    status: "stopped".to_string(),
                    message: format!("Recording saved to {:?}", artifact.path),
                    artifact: Some(artifact),
                }),
            )
                .into_response()
        }
        Err(RecorderError::NoAudioCaptured) => (
            StatusCode::OK,
            Json(StopRecordingResponse {
                meeting_id,
                status: "empty".to_string(),
                message: "Nothing was recorded: no participant audio was captured".to_string(),
                artifact: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to stop recording: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /meetings/:meeting_id/status
/// Get status of a recording session
pub async fn get_meeting_status(
    State(state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&meeting_id) {
        Some(active) => (StatusCode::OK, Json(active.session.status())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Meeting {} not found", meeting_id),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
