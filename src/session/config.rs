use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique meeting identifier (e.g., "meeting-2026-08-22-standup")
    pub meeting_id: String,

    /// Directory that receives checkpoints and the final mix
    pub output_dir: PathBuf,

    /// Sample rate of incoming PCM frames
    pub sample_rate: u32,

    /// Channel count of incoming PCM frames (1 = mono, 2 = stereo)
    pub channels: u16,

    /// How often the watchdog examines session health
    /// Default: 10 seconds
    pub watchdog_interval: Duration,

    /// How long ingest may sit idle before the watchdog warns
    /// Default: 60 seconds
    pub idle_warning_after: Duration,

    /// How often a durable checkpoint is written while recording
    /// Default: 60 seconds
    pub checkpoint_interval: Duration,

    /// Wall-clock vs audio duration divergence that triggers a notice
    /// Default: 30 seconds
    pub duration_gap_tolerance: Duration,

    /// Keep the last checkpoint on disk after a successful finalize
    pub keep_last_checkpoint: bool,
}

impl SessionConfig {
    pub fn for_meeting(meeting_id: impl Into<String>) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            meeting_id: format!("meeting-{}", uuid::Uuid::new_v4()),
            output_dir: PathBuf::from("./recordings"),
            sample_rate: 48000, // Voice bridges deliver 48kHz
            channels: 2,        // Stereo
            watchdog_interval: Duration::from_secs(10),
            idle_warning_after: Duration::from_secs(60),
            checkpoint_interval: Duration::from_secs(60),
            duration_gap_tolerance: Duration::from_secs(30),
            keep_last_checkpoint: false,
        }
    }
}
