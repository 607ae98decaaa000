use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a recording session.
///
/// The only transitions are Idle -> Recording on start and
/// Recording -> Stopped on stop. Transport reconnects are observed and
/// logged but never move the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Recording,
    Stopped,
}

impl SessionPhase {
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionPhase::Recording)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Recording => "recording",
            SessionPhase::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Connectivity changes reported by the audio transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Reconnected,
}

impl std::fmt::Display for TransportEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportEvent::Connected => "connected",
            TransportEvent::Disconnected => "disconnected",
            TransportEvent::Reconnected => "reconnected",
        };
        write!(f, "{}", name)
    }
}

/// Point-in-time view of a session, cheap to assemble and safe to call
/// from any task. Everything here comes from counters and timestamps;
/// no buffer contents are touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub meeting_id: String,
    pub phase: SessionPhase,
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds from start to stop, or to now while still recording.
    pub wall_clock_secs: Option<f64>,
    pub participant_count: usize,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub total_bytes: u64,
    pub estimated_duration_secs: f64,
    pub last_frame_at: Option<DateTime<Utc>>,
    pub seconds_since_last_frame: Option<f64>,
    pub transport_connected: bool,
    pub transport_drops: u64,
    pub checkpoint_count: u64,
    pub last_checkpoint_at: Option<DateTime<Utc>>,
}
