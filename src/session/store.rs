// Per-participant capture buffers.
//
// One append-only byte buffer per participant, created lazily on that
// participant's first frame. The map sits behind an RwLock and each buffer
// behind its own Mutex, so concurrent appends for different participants
// never contend and snapshot reads hold each lock only long enough to copy.
// Buffers are only ever truncated by an explicit session reset.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::audio::frame::ParticipantId;
use crate::audio::mix::ParticipantTrack;

/// Capture state for a single participant.
#[derive(Debug)]
struct ParticipantBuffer {
    /// Display name from the first labeled frame.
    label: Option<String>,
    /// Raw interleaved PCM bytes, append-only.
    pcm: Vec<u8>,
    /// How far into the session this participant's first frame arrived.
    joined_offset_ms: u64,
    /// Wall-clock time of the most recent append.
    last_append: DateTime<Utc>,
}

/// All participant buffers for one session.
pub struct BufferStore {
    sample_rate: u32,
    channels: u16,
    buffers: RwLock<HashMap<ParticipantId, Arc<Mutex<ParticipantBuffer>>>>,
    total_bytes: AtomicU64,
}

impl BufferStore {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            buffers: RwLock::new(HashMap::new()),
            total_bytes: AtomicU64::new(0),
        }
    }

    /// Append PCM bytes to one participant's buffer, creating it on first
    /// contact, and stamp the buffer's last-append time. `joined_offset_ms`
    /// is only consulted at creation time; the buffer keeps the offset of
    /// the very first frame.
    pub fn append(
        &self,
        participant: ParticipantId,
        label: Option<&str>,
        pcm: &[u8],
        joined_offset_ms: u64,
    ) {
        let handle = self.handle_for(participant, label, joined_offset_ms);

        let mut buffer = handle.lock().unwrap();
        buffer.pcm.extend_from_slice(pcm);
        buffer.last_append = Utc::now();
        if buffer.label.is_none() {
            buffer.label = label.map(str::to_owned);
        }
        drop(buffer);

        self.total_bytes.fetch_add(pcm.len() as u64, Ordering::Relaxed);
        debug!("Wrote {} bytes for participant {}", pcm.len(), participant);
    }

    fn handle_for(
        &self,
        participant: ParticipantId,
        label: Option<&str>,
        joined_offset_ms: u64,
    ) -> Arc<Mutex<ParticipantBuffer>> {
        // Fast path: participant already known, shared map lock only.
        {
            let map = self.buffers.read().unwrap();
            if let Some(handle) = map.get(&participant) {
                return Arc::clone(handle);
            }
        }

        let mut map = self.buffers.write().unwrap();
        let handle = map.entry(participant).or_insert_with(|| {
            info!(
                "Started recording participant {} ({}) at +{}ms",
                label.unwrap_or("unnamed"),
                participant,
                joined_offset_ms
            );
            Arc::new(Mutex::new(ParticipantBuffer {
                label: label.map(str::to_owned),
                pcm: Vec::new(),
                joined_offset_ms,
                last_append: Utc::now(),
            }))
        });
        Arc::clone(handle)
    }

    /// Number of participants with a buffer.
    pub fn participant_count(&self) -> usize {
        self.buffers.read().unwrap().len()
    }

    /// Total payload bytes across all participants.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn has_data(&self) -> bool {
        self.total_bytes() > 0
    }

    /// Payload bytes held for one participant, if known.
    pub fn bytes_for(&self, participant: ParticipantId) -> Option<u64> {
        let handle = {
            let map = self.buffers.read().unwrap();
            map.get(&participant).map(Arc::clone)
        }?;
        let len = handle.lock().unwrap().pcm.len() as u64;
        Some(len)
    }

    /// Wall-clock time of the newest append across all participants, or
    /// `None` before any frame has landed.
    pub fn last_append_at(&self) -> Option<DateTime<Utc>> {
        self.collect_handles()
            .into_iter()
            .map(|(_, handle)| handle.lock().unwrap().last_append)
            .max()
    }

    /// Duration the capture covers so far, derived from data volume: the
    /// longest participant timeline (join offset plus buffered audio), not
    /// the sum of buffer sizes. Concurrent speakers overlap in time.
    pub fn estimated_duration_secs(&self) -> f64 {
        let bytes_per_second = (self.sample_rate as u64 * self.channels as u64 * 2).max(1);

        self.collect_handles()
            .into_iter()
            .map(|(_, handle)| {
                let buffer = handle.lock().unwrap();
                buffer.joined_offset_ms as f64 / 1000.0
                    + buffer.pcm.len() as f64 / bytes_per_second as f64
            })
            .fold(0.0, f64::max)
    }

    /// Copy out a consistent view of every buffer for mixing. Each buffer's
    /// lock is held only for its own copy, so ingest keeps flowing for the
    /// other participants while a checkpoint or finalize reads.
    pub fn snapshot(&self) -> Vec<ParticipantTrack> {
        let mut tracks: Vec<ParticipantTrack> = self
            .collect_handles()
            .into_iter()
            .map(|(participant, handle)| {
                let buffer = handle.lock().unwrap();
                ParticipantTrack {
                    participant,
                    label: buffer.label.clone(),
                    pcm: buffer.pcm.clone(),
                    lead_in_samples: self.lead_in_samples(buffer.joined_offset_ms),
                }
            })
            .collect();

        tracks.sort_by_key(|t| t.participant);
        tracks
    }

    /// Remove every buffer. Only an explicit session reset calls this.
    pub fn clear(&self) {
        let mut map = self.buffers.write().unwrap();
        if !map.is_empty() {
            info!("Clearing {} participant buffers", map.len());
        }
        map.clear();
        self.total_bytes.store(0, Ordering::Relaxed);
    }

    fn collect_handles(&self) -> Vec<(ParticipantId, Arc<Mutex<ParticipantBuffer>>)> {
        let map = self.buffers.read().unwrap();
        map.iter().map(|(id, h)| (*id, Arc::clone(h))).collect()
    }

    fn lead_in_samples(&self, joined_offset_ms: u64) -> usize {
        (joined_offset_ms * self.sample_rate as u64 / 1000) as usize
    }
}
