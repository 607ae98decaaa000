// Durable checkpoints of in-progress recordings.
//
// While a session records, the current mix is periodically rendered and
// written to disk so a crash loses at most one interval of audio. Rendering
// and file I/O run on the blocking pool against a buffer snapshot; the
// ingest path never waits on them. Each file is written under a temporary
// name and renamed into place, and the superseded checkpoint is removed
// only after the new one is durable.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{debug, info, warn};

use crate::audio::mix::{mix, MixSpec};
use crate::audio::wav::write_wav_file;
use crate::error::Result;
use crate::session::store::BufferStore;

/// Metadata for one durable checkpoint file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointInfo {
    /// Checkpoint number (1-indexed, monotonic within the session)
    pub seq: u64,
    /// Path of the rendered WAV
    pub path: PathBuf,
    /// When the checkpoint became durable
    pub created_at: DateTime<Utc>,
    /// Audio duration covered, in seconds
    pub audio_duration_secs: f64,
    /// Participants present in the mix
    pub participant_count: usize,
    /// Total payload bytes at snapshot time
    pub total_bytes: u64,
}

/// Renders and rotates checkpoint files for one session.
pub struct CheckpointManager {
    meeting_id: String,
    output_dir: PathBuf,
    spec: MixSpec,
    seq: AtomicU64,
    written: AtomicU64,
    latest: Mutex<Option<CheckpointInfo>>,
}

impl CheckpointManager {
    pub fn new(meeting_id: String, output_dir: PathBuf, spec: MixSpec) -> Result<Self> {
        fs::create_dir_all(&output_dir)?;

        Ok(Self {
            meeting_id,
            output_dir,
            spec,
            seq: AtomicU64::new(0),
            written: AtomicU64::new(0),
            latest: Mutex::new(None),
        })
    }

    /// Render the current buffers and write a checkpoint, or skip quietly
    /// when nothing has been captured yet.
    ///
    /// On failure the previous checkpoint stays in place and the next
    /// interval simply tries again with fresher data.
    pub async fn write_if_data(&self, store: &BufferStore) -> Result<Option<CheckpointInfo>> {
        if !store.has_data() {
            debug!("Skipping checkpoint: no audio buffered yet");
            return Ok(None);
        }

        let tracks = store.snapshot();
        let total_bytes = store.total_bytes();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let final_path = self.checkpoint_path(seq);
        let tmp_path = final_path.with_extension("wav.tmp");
        let durable_path = final_path.clone();
        let spec = self.spec;

        let (audio_duration_secs, participant_count) = task::spawn_blocking(move || {
            let rendered = mix(&tracks, spec).and_then(|mixed| {
                write_wav_file(&tmp_path, &mixed.samples, mixed.sample_rate)?;
                fs::rename(&tmp_path, &final_path)?;
                Ok((mixed.audio_duration_secs(), mixed.participants.len()))
            });
            if rendered.is_err() {
                let _ = fs::remove_file(&tmp_path);
            }
            rendered
        })
        .await??;

        let info = CheckpointInfo {
            seq,
            path: durable_path,
            created_at: Utc::now(),
            audio_duration_secs,
            participant_count,
            total_bytes,
        };

        self.written.fetch_add(1, Ordering::SeqCst);
        let superseded = self.latest.lock().unwrap().replace(info.clone());
        if let Some(previous) = superseded {
            if let Err(e) = fs::remove_file(&previous.path) {
                warn!(
                    "Failed to remove superseded checkpoint {:?}: {}",
                    previous.path, e
                );
            }
        }

        info!(
            "Checkpoint {} durable: {:.1}s of audio from {} participants ({:?})",
            seq, audio_duration_secs, participant_count, info.path
        );
        Ok(Some(info))
    }

    /// The most recent durable checkpoint, if any.
    pub fn latest(&self) -> Option<CheckpointInfo> {
        self.latest.lock().unwrap().clone()
    }

    /// Number of checkpoints successfully written.
    pub fn written_count(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }

    /// Remove the surviving checkpoint once the finished mix is durable.
    pub fn remove_last(&self) {
        if let Some(last) = self.latest.lock().unwrap().take() {
            match fs::remove_file(&last.path) {
                Ok(()) => info!("Removed checkpoint superseded by final mix: {:?}", last.path),
                Err(e) => warn!("Failed to remove checkpoint {:?}: {}", last.path, e),
            }
        }
    }

    fn checkpoint_path(&self, seq: u64) -> PathBuf {
        self.output_dir
            .join(format!("{}-checkpoint-{:03}.wav", self.meeting_id, seq))
    }
}
