use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::{Frame, ParticipantId};
use crate::error::Result;
use crate::session::TransportEvent;

/// Participant audio frame received over NATS
#[derive(Debug, Serialize, Deserialize)]
pub struct FrameMessage {
    pub meeting_id: String,
    /// Transport-assigned participant id; 0 means "unknown speaker"
    pub participant: u64,
    pub label: Option<String>,
    /// Base64-encoded interleaved s16le PCM bytes
    pub pcm: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: DateTime<Utc>,
}

impl FrameMessage {
    pub fn from_frame(meeting_id: &str, frame: &Frame) -> Self {
        Self {
            meeting_id: meeting_id.to_string(),
            participant: frame.participant.0,
            label: frame.label.clone(),
            pcm: base64::engine::general_purpose::STANDARD.encode(&frame.pcm),
            sample_rate: frame.sample_rate,
            channels: frame.channels,
            timestamp: frame.received_at,
        }
    }

    /// Decode the wire form back into a capture frame.
    pub fn into_frame(self) -> Result<Frame> {
        let pcm = base64::engine::general_purpose::STANDARD.decode(&self.pcm)?;
        Ok(Frame {
            participant: ParticipantId(self.participant),
            label: self.label,
            pcm,
            sample_rate: self.sample_rate,
            channels: self.channels,
            received_at: self.timestamp,
        })
    }
}

/// Transport connectivity change received over NATS
#[derive(Debug, Serialize, Deserialize)]
pub struct TransportEventMessage {
    pub meeting_id: String,
    pub event: TransportEvent,
    pub timestamp: DateTime<Utc>,
}
