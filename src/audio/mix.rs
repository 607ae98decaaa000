// Mixing of per-participant capture buffers into a single mono track.
//
// Each participant's raw PCM bytes are converted to mono independently,
// placed at that participant's join offset, right-padded with silence to the
// longest track, and summed sample-by-sample. The sum is only scaled down
// when its peak exceeds the 16-bit range, and then by a single uniform
// factor so the loudest moment lands exactly at the limit. The mix never
// divides by participant count.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::frame::ParticipantId;
use crate::error::{RecorderError, Result};

/// Sample format shared by all participant buffers in a session.
#[derive(Debug, Clone, Copy)]
pub struct MixSpec {
    /// Sample rate of the input buffers and of the mixed output, in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count of the input buffers.
    pub channels: u16,
}

/// One participant's full capture, as handed over by the buffer store.
#[derive(Debug, Clone)]
pub struct ParticipantTrack {
    pub participant: ParticipantId,
    pub label: Option<String>,
    /// Interleaved 16-bit little-endian PCM bytes.
    pub pcm: Vec<u8>,
    /// Mono samples of silence preceding the first byte, derived from how
    /// long after session start this participant's first frame arrived.
    pub lead_in_samples: usize,
}

/// Byte total for one participant, carried into artifact metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantTotal {
    pub participant: ParticipantId,
    pub label: Option<String>,
    pub bytes: u64,
}

/// The finalized single-track audio plus derived metadata.
#[derive(Debug, Clone)]
pub struct MixResult {
    /// Mixed mono samples.
    pub samples: Vec<i16>,
    /// Sample rate of `samples` in Hz.
    pub sample_rate: u32,
    /// Peak magnitude of the raw sum, before any scaling.
    pub peak: i32,
    /// Whether the uniform scale-down was applied.
    pub scaled: bool,
    /// Per-participant payload byte totals, ordered by participant id.
    pub participants: Vec<ParticipantTotal>,
}

impl MixResult {
    /// Duration derived from the audio data itself. This is the longest
    /// participant timeline, not the sum of participant volumes: concurrent
    /// speakers occupy the same wall-clock interval.
    pub fn audio_duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Convert one participant's interleaved PCM bytes to mono samples.
///
/// Channels are averaged in 32-bit arithmetic, which cannot overflow for
/// 16-bit input. A trailing partial sample group (from a malformed frame
/// tail) is ignored.
pub fn decode_mono(pcm: &[u8], channels: u16) -> Vec<i16> {
    let channels = channels.max(1) as usize;
    let stride = channels * 2;
    let mut mono = Vec::with_capacity(pcm.len() / stride);

    for group in pcm.chunks_exact(stride) {
        let mut sum: i32 = 0;
        for sample in group.chunks_exact(2) {
            sum += i16::from_le_bytes([sample[0], sample[1]]) as i32;
        }
        mono.push((sum / channels as i32) as i16);
    }

    mono
}

/// Mix all participant tracks into one mono track.
///
/// Returns [`RecorderError::NoAudioCaptured`] when no track contains any
/// audio, so the caller can distinguish "nothing recorded" from a failure.
pub fn mix(tracks: &[ParticipantTrack], spec: MixSpec) -> Result<MixResult> {
    // Convert each track to mono independently; raw bytes are never mixed
    // across participants before channel conversion.
    let mut converted: Vec<(usize, Vec<i16>)> = Vec::with_capacity(tracks.len());
    for track in tracks {
        let mono = decode_mono(&track.pcm, spec.channels);
        if mono.is_empty() {
            debug!("Skipping empty track for participant {}", track.participant);
            continue;
        }
        converted.push((track.lead_in_samples, mono));
    }

    if converted.is_empty() {
        return Err(RecorderError::NoAudioCaptured);
    }

    // Output spans the longest participant timeline; shorter tracks are
    // padded with silence on the right so nobody shifts or compresses.
    let max_len = converted
        .iter()
        .map(|(lead_in, mono)| lead_in + mono.len())
        .max()
        .unwrap_or(0);

    // Linear superposition in i32. No division by participant count here:
    // normalization is decided after the peak is known.
    let mut mixed: Vec<i32> = vec![0; max_len];
    for (lead_in, mono) in &converted {
        for (i, &sample) in mono.iter().enumerate() {
            mixed[lead_in + i] += sample as i32;
        }
    }

    let peak = mixed.iter().map(|s| s.abs()).max().unwrap_or(0);
    let limit = i16::MAX as i32;

    let (samples, scaled) = if peak > limit {
        // One uniform factor for every sample; the loudest moment lands
        // exactly at the limit and all relative levels are preserved.
        let scale = limit as f64 / peak as f64;
        let scaled_samples: Vec<i16> = mixed
            .iter()
            .map(|&s| (s as f64 * scale).round() as i16)
            .collect();
        (scaled_samples, true)
    } else {
        (mixed.iter().map(|&s| s as i16).collect(), false)
    };

    let mut participants: Vec<ParticipantTotal> = tracks
        .iter()
        .map(|t| ParticipantTotal {
            participant: t.participant,
            label: t.label.clone(),
            bytes: t.pcm.len() as u64,
        })
        .collect();
    participants.sort_by_key(|t| t.participant);

    info!(
        "Mixed {} participants: {} samples ({:.1}s), peak {}{}",
        participants.len(),
        samples.len(),
        samples.len() as f64 / spec.sample_rate as f64,
        peak,
        if scaled { ", scaled to range" } else { "" }
    );

    Ok(MixResult {
        samples,
        sample_rate: spec.sample_rate,
        peak,
        scaled,
        participants,
    })
}
