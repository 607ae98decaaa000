//! Error types for the recording subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    // Lifecycle errors
    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("session already finished")]
    SessionFinished,

    /// Mixing found no participant audio at all. Distinct from other
    /// failures so the controller can report "nothing was recorded" rather
    /// than a defect.
    #[error("nothing was recorded: no participant audio was captured")]
    NoAudioCaptured,

    // Artifact errors
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mixing worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    // Wire errors
    #[error("malformed frame payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, RecorderError>;
