//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - Frame ingest from the audio transport, one buffer per participant
//! - Periodic durable checkpoints of the in-progress mix
//! - Health monitoring of the capture pipeline
//! - Final mixing and WAV persistence on stop

mod checkpoint;
mod config;
mod session;
mod status;
mod store;
mod watchdog;

pub use checkpoint::{CheckpointInfo, CheckpointManager};
pub use config::SessionConfig;
pub use session::{ArtifactKind, RecordingArtifact, RecordingSession};
pub use status::{SessionPhase, SessionStatus, TransportEvent};
pub use store::BufferStore;
