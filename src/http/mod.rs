//! HTTP API server for external control
//!
//! This module provides a REST API for controlling recording sessions:
//! - POST /meetings/record/start - Start a new recording
//! - POST /meetings/record/stop/:id - Stop a recording and fetch the artifact
//! - GET /meetings/:id/status - Query session status
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{StartRecordingRequest, StartRecordingResponse, StopRecordingResponse};
pub use routes::create_router;
pub use state::{ActiveSession, AppState, BridgeHandle};
