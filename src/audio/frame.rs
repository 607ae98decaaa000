use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity of one meeting participant, as assigned by the voice
/// transport. The transport occasionally emits frames with a zero sentinel
/// identity (decoder hiccups, synthetic keep-alive packets); those are not
/// attributable to anyone and must be dropped at ingest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    /// Whether this identity can own a buffer.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One chunk of raw PCM audio for one participant, as delivered by the
/// voice transport.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Who spoke.
    pub participant: ParticipantId,
    /// Display name, if the transport knows it (first one seen wins).
    pub label: Option<String>,
    /// Interleaved 16-bit little-endian PCM bytes.
    pub pcm: Vec<u8>,
    /// Sample rate of `pcm` in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels in `pcm`.
    pub channels: u16,
    /// Wall-clock time the transport handed the frame over. Timeline
    /// placement uses the session clock at ingest, not this stamp.
    pub received_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(participant: ParticipantId, pcm: Vec<u8>, received_at: DateTime<Utc>) -> Self {
        Self {
            participant,
            label: None,
            pcm,
            sample_rate: 48000,
            channels: 2,
            received_at,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_format(mut self, sample_rate: u32, channels: u16) -> Self {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self
    }
}
