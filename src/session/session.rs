use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use super::checkpoint::CheckpointManager;
use super::config::SessionConfig;
use super::status::{SessionPhase, SessionStatus, TransportEvent};
use super::store::BufferStore;
use super::watchdog::Watchdog;
use crate::audio::frame::Frame;
use crate::audio::mix::{mix, MixSpec, ParticipantTotal};
use crate::audio::wav::{write_wav_file, WavInfo};
use crate::error::{RecorderError, Result};
use crate::notify::{LogNotifier, Notice, Notifier};

/// What a finished session hands back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The complete final mix.
    Final,
    /// The last durable checkpoint, surfaced because the final mix failed.
    CheckpointFallback,
}

/// Description of the recording file produced by [`RecordingSession::stop`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingArtifact {
    pub meeting_id: String,
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    /// How long the session ran by the wall clock.
    pub wall_duration_secs: f64,
    /// How much audio the artifact actually contains.
    pub audio_duration_secs: f64,
    /// Sample rate of the artifact audio in Hz.
    pub sample_rate: u32,
    pub total_bytes: u64,
    /// Per-participant byte totals; empty for a checkpoint fallback.
    pub participants: Vec<ParticipantTotal>,
    /// Peak magnitude of the raw mix sum; None for a checkpoint fallback.
    pub peak: Option<i32>,
    /// Whether peak scaling was applied; None for a checkpoint fallback.
    pub scaled: Option<bool>,
}

impl RecordingArtifact {
    /// Divergence between wall-clock and audio duration. A large gap means
    /// frames were lost or participants sent nothing for long stretches;
    /// the mix deliberately does not paper over mid-stream gaps.
    pub fn duration_gap_secs(&self) -> f64 {
        (self.wall_duration_secs - self.audio_duration_secs).abs()
    }

    pub fn has_duration_anomaly(&self, tolerance: std::time::Duration) -> bool {
        self.duration_gap_secs() > tolerance.as_secs_f64()
    }
}

/// Guarded lifecycle state. Every transition locks this; the ingest path
/// never does.
struct ControlState {
    phase: SessionPhase,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

/// State shared between the session handle, the ingest path, and the
/// watchdog task.
pub(crate) struct SessionInner {
    pub(crate) config: SessionConfig,
    pub(crate) store: BufferStore,
    pub(crate) checkpoints: CheckpointManager,
    pub(crate) notifier: Arc<dyn Notifier>,

    control: Mutex<ControlState>,

    /// Gate read by every ingest call without taking any lock. True means
    /// frames are refused: before start and after stop. Transport events
    /// never touch it.
    halted: AtomicBool,

    /// Monotonic reference point for idle measurement.
    epoch: tokio::time::Instant,
    /// Milliseconds from `epoch` when recording started.
    start_ms: AtomicU64,
    /// Milliseconds from `epoch` when the last frame was accepted.
    last_frame_ms: AtomicU64,

    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    transport_connected: AtomicBool,
    transport_drops: AtomicU64,
}

impl SessionInner {
    pub(crate) fn meeting_id(&self) -> &str {
        &self.config.meeting_id
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.control.lock().unwrap().phase
    }

    pub(crate) fn halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub(crate) fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::SeqCst)
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Seconds since the last accepted frame, or None when no frame has
    /// ever been accepted.
    pub(crate) fn idle_seconds(&self) -> Option<f64> {
        if self.frames_received() == 0 {
            return None;
        }
        let last = self.last_frame_ms.load(Ordering::SeqCst);
        Some(self.now_ms().saturating_sub(last) as f64 / 1000.0)
    }

    /// Seconds since recording started.
    pub(crate) fn seconds_since_start(&self) -> f64 {
        let start = self.start_ms.load(Ordering::SeqCst);
        self.now_ms().saturating_sub(start) as f64 / 1000.0
    }

    fn ingest(&self, frame: Frame) {
        if self.halted.load(Ordering::SeqCst) {
            self.frames_dropped.fetch_add(1, Ordering::SeqCst);
            debug!("Dropping frame from {}: session not accepting audio", frame.participant);
            return;
        }

        if !frame.participant.is_valid() {
            self.frames_dropped.fetch_add(1, Ordering::SeqCst);
            debug!("Dropping frame without a valid participant id");
            return;
        }

        if frame.pcm.is_empty() {
            self.frames_dropped.fetch_add(1, Ordering::SeqCst);
            debug!("Dropping empty frame from {}", frame.participant);
            return;
        }

        if frame.sample_rate != self.config.sample_rate || frame.channels != self.config.channels {
            self.frames_dropped.fetch_add(1, Ordering::SeqCst);
            debug!(
                "Dropping frame from {} with unexpected format {}Hz/{}ch",
                frame.participant, frame.sample_rate, frame.channels
            );
            return;
        }

        let now = self.now_ms();
        let joined_offset_ms = now.saturating_sub(self.start_ms.load(Ordering::SeqCst));

        self.store
            .append(frame.participant, frame.label.as_deref(), &frame.pcm, joined_offset_ms);
        self.last_frame_ms.store(now, Ordering::SeqCst);
        self.frames_received.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) async fn notify(&self, notice: Notice) {
        self.notifier.notify(notice).await;
    }
}

/// A recording session that accepts participant audio, keeps it durable
/// through periodic checkpoints, and renders the final mix on stop.
pub struct RecordingSession {
    inner: Arc<SessionInner>,

    /// Signals the watchdog task to exit.
    shutdown: watch::Sender<bool>,

    /// Handle for the watchdog task while recording.
    watchdog_handle: Mutex<Option<JoinHandle<()>>>,
}

impl RecordingSession {
    /// Create a session in the idle phase. Nothing is captured until
    /// [`start`](Self::start) is called.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_notifier(config, Arc::new(LogNotifier))
    }

    pub fn with_notifier(config: SessionConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        info!("Creating recording session: {}", config.meeting_id);

        let store = BufferStore::new(config.sample_rate, config.channels);
        let checkpoints = CheckpointManager::new(
            config.meeting_id.clone(),
            config.output_dir.clone(),
            MixSpec {
                sample_rate: config.sample_rate,
                channels: config.channels,
            },
        )?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                store,
                checkpoints,
                notifier,
                control: Mutex::new(ControlState {
                    phase: SessionPhase::Idle,
                    started_at: None,
                    stopped_at: None,
                }),
                halted: AtomicBool::new(true),
                epoch: tokio::time::Instant::now(),
                start_ms: AtomicU64::new(0),
                last_frame_ms: AtomicU64::new(0),
                frames_received: AtomicU64::new(0),
                frames_dropped: AtomicU64::new(0),
                transport_connected: AtomicBool::new(false),
                transport_drops: AtomicU64::new(0),
            }),
            shutdown,
            watchdog_handle: Mutex::new(None),
        })
    }

    pub fn meeting_id(&self) -> &str {
        self.inner.meeting_id()
    }

    /// Start recording. Fails if the session is already recording or has
    /// already finished; a finished session is never restarted.
    pub async fn start(&self) -> Result<()> {
        {
            let mut control = self.inner.control.lock().unwrap();
            match control.phase {
                SessionPhase::Recording => return Err(RecorderError::AlreadyRecording),
                SessionPhase::Stopped => return Err(RecorderError::SessionFinished),
                SessionPhase::Idle => {}
            }
            self.inner.store.clear();
            self.inner.start_ms.store(self.inner.now_ms(), Ordering::SeqCst);
            self.inner.halted.store(false, Ordering::SeqCst);
            control.phase = SessionPhase::Recording;
            control.started_at = Some(Utc::now());
        }

        let watchdog = Watchdog::new(Arc::clone(&self.inner));
        let handle = tokio::spawn(watchdog.run(self.shutdown.subscribe()));
        *self.watchdog_handle.lock().unwrap() = Some(handle);

        info!("Recording started for meeting {}", self.meeting_id());
        self.inner
            .notify(Notice::info(self.meeting_id(), "Recording started"))
            .await;

        Ok(())
    }

    /// Hand one participant frame to the session. Safe to call from any
    /// thread; does nothing but count the frame once the session stops.
    pub fn ingest(&self, frame: Frame) {
        self.inner.ingest(frame);
    }

    /// Record a transport connectivity change. Capture state, buffers, and
    /// the session phase are left exactly as they were, so audio resumes
    /// seamlessly when frames flow again. While recording, disruptions are
    /// also surfaced to the user as notices.
    pub async fn observe_transport(&self, event: TransportEvent) {
        let recording = self.inner.phase().is_recording();
        match event {
            TransportEvent::Connected => {
                self.inner.transport_connected.store(true, Ordering::SeqCst);
                info!("Audio transport connected for meeting {}", self.meeting_id());
            }
            TransportEvent::Reconnected => {
                self.inner.transport_connected.store(true, Ordering::SeqCst);
                info!("Audio transport reconnected for meeting {}", self.meeting_id());
                if recording {
                    self.inner
                        .notify(Notice::info(
                            self.meeting_id(),
                            "Audio transport reconnected; recording continues",
                        ))
                        .await;
                }
            }
            TransportEvent::Disconnected => {
                self.inner.transport_connected.store(false, Ordering::SeqCst);
                self.inner.transport_drops.fetch_add(1, Ordering::SeqCst);
                warn!(
                    "Audio transport disconnected for meeting {}; keeping all captured audio and waiting for it to return",
                    self.meeting_id()
                );
                if recording {
                    self.inner
                        .notify(Notice::warning(
                            self.meeting_id(),
                            "Audio transport dropped; captured audio is safe and recording resumes once it returns",
                        ))
                        .await;
                }
            }
        }
    }

    /// Point-in-time session snapshot, assembled from counters and
    /// timestamps only.
    pub fn status(&self) -> SessionStatus {
        let (phase, started_at, stopped_at) = {
            let control = self.inner.control.lock().unwrap();
            (control.phase, control.started_at, control.stopped_at)
        };
        let wall_clock_secs = started_at.map(|start| {
            let end = stopped_at.unwrap_or_else(Utc::now);
            (end - start).num_milliseconds().max(0) as f64 / 1000.0
        });

        SessionStatus {
            meeting_id: self.meeting_id().to_string(),
            phase,
            started_at,
            wall_clock_secs,
            participant_count: self.inner.store.participant_count(),
            frames_received: self.inner.frames_received.load(Ordering::SeqCst),
            frames_dropped: self.inner.frames_dropped.load(Ordering::SeqCst),
            total_bytes: self.inner.store.total_bytes(),
            estimated_duration_secs: self.inner.store.estimated_duration_secs(),
            last_frame_at: self.inner.store.last_append_at(),
            seconds_since_last_frame: self.inner.idle_seconds(),
            transport_connected: self.inner.transport_connected.load(Ordering::SeqCst),
            transport_drops: self.inner.transport_drops.load(Ordering::SeqCst),
            checkpoint_count: self.inner.checkpoints.written_count(),
            last_checkpoint_at: self.inner.checkpoints.latest().map(|c| c.created_at),
        }
    }

    /// Stop recording and render the final mix.
    ///
    /// The stop is permanent: the gate closes, the watchdog exits, and the
    /// mix is written next to the checkpoints. When mixing fails but a
    /// checkpoint survived, that checkpoint is returned as the artifact
    /// instead of losing the meeting.
    pub async fn stop(&self) -> Result<RecordingArtifact> {
        let started_at;
        let stopped_at;
        {
            let mut control = self.inner.control.lock().unwrap();
            match control.phase {
                SessionPhase::Idle | SessionPhase::Stopped => {
                    return Err(RecorderError::NotRecording)
                }
                SessionPhase::Recording => {}
            }
            control.phase = SessionPhase::Stopped;
            stopped_at = Utc::now();
            control.stopped_at = Some(stopped_at);
            started_at = control.started_at.unwrap_or(stopped_at);
            self.inner.halted.store(true, Ordering::SeqCst);
        }

        info!("Stopping recording for meeting {}", self.meeting_id());

        let _ = self.shutdown.send(true);
        let handle = self.watchdog_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Watchdog task panicked: {}", e);
            }
        }

        let wall_duration_secs =
            (stopped_at - started_at).num_milliseconds().max(0) as f64 / 1000.0;
        self.finalize(started_at, stopped_at, wall_duration_secs).await
    }

    async fn finalize(
        &self,
        started_at: DateTime<Utc>,
        stopped_at: DateTime<Utc>,
        wall_duration_secs: f64,
    ) -> Result<RecordingArtifact> {
        let inner = &self.inner;
        let meeting_id = inner.config.meeting_id.clone();
        let tracks = inner.store.snapshot();
        let total_bytes = inner.store.total_bytes();

        let final_path = inner.config.output_dir.join(format!("{}.wav", meeting_id));
        let tmp_path = final_path.with_extension("wav.tmp");
        let durable_path = final_path.clone();
        let spec = MixSpec {
            sample_rate: inner.config.sample_rate,
            channels: inner.config.channels,
        };

        let rendered = task::spawn_blocking(move || {
            let outcome = mix(&tracks, spec).and_then(|mixed| {
                write_wav_file(&tmp_path, &mixed.samples, mixed.sample_rate)?;
                std::fs::rename(&tmp_path, &final_path)?;
                Ok(mixed)
            });
            if outcome.is_err() {
                let _ = std::fs::remove_file(&tmp_path);
            }
            outcome
        })
        .await?;

        match rendered {
            Ok(mixed) => {
                let artifact = RecordingArtifact {
                    meeting_id: meeting_id.clone(),
                    kind: ArtifactKind::Final,
                    path: durable_path,
                    started_at,
                    stopped_at,
                    wall_duration_secs,
                    audio_duration_secs: mixed.audio_duration_secs(),
                    sample_rate: mixed.sample_rate,
                    total_bytes,
                    participants: mixed.participants.clone(),
                    peak: Some(mixed.peak),
                    scaled: Some(mixed.scaled),
                };

                if inner.config.keep_last_checkpoint {
                    debug!("Keeping last checkpoint alongside the final mix");
                } else {
                    inner.checkpoints.remove_last();
                }

                info!(
                    "Recording finished for meeting {}: {:.1}s of audio from {} participants ({:?})",
                    meeting_id,
                    artifact.audio_duration_secs,
                    artifact.participants.len(),
                    artifact.path
                );
                inner
                    .notify(Notice::info(
                        &meeting_id,
                        format!(
                            "Recording saved: {:.1}s of audio from {} participants",
                            artifact.audio_duration_secs,
                            artifact.participants.len()
                        ),
                    ))
                    .await;

                if artifact.has_duration_anomaly(inner.config.duration_gap_tolerance) {
                    warn!(
                        "Meeting {} ran {:.1}s but the mix contains {:.1}s of audio",
                        meeting_id, wall_duration_secs, artifact.audio_duration_secs
                    );
                    inner
                        .notify(Notice::warning(
                            &meeting_id,
                            format!(
                                "Recorded audio covers {:.1}s of a {:.1}s meeting; frames were lost or participants were silent for long stretches",
                                artifact.audio_duration_secs, wall_duration_secs
                            ),
                        ))
                        .await;
                }

                Ok(artifact)
            }
            Err(e) => {
                let fallback = inner.checkpoints.latest().and_then(|checkpoint| {
                    WavInfo::probe(&checkpoint.path)
                        .ok()
                        .map(|info| (checkpoint, info))
                });
                if let Some((checkpoint, info)) = fallback {
                    error!(
                        "Final mix failed for meeting {} ({}); falling back to checkpoint {:?}",
                        meeting_id, e, checkpoint.path
                    );
                    inner
                        .notify(Notice::error(
                            &meeting_id,
                            format!(
                                "Final mix failed; the last checkpoint ({:.1}s of audio) was preserved",
                                checkpoint.audio_duration_secs
                            ),
                        ))
                        .await;

                    Ok(RecordingArtifact {
                        meeting_id,
                        kind: ArtifactKind::CheckpointFallback,
                        path: checkpoint.path,
                        started_at,
                        stopped_at,
                        wall_duration_secs,
                        audio_duration_secs: checkpoint.audio_duration_secs,
                        sample_rate: info.sample_rate,
                        total_bytes,
                        participants: Vec::new(),
                        peak: None,
                        scaled: None,
                    })
                } else if matches!(e, RecorderError::NoAudioCaptured) {
                    warn!("Meeting {} produced no audio and has no checkpoint", meeting_id);
                    inner
                        .notify(Notice::warning(
                            &meeting_id,
                            "Nothing was recorded: no participant audio was captured",
                        ))
                        .await;
                    Err(RecorderError::NoAudioCaptured)
                } else {
                    error!(
                        "Final mix failed for meeting {} and no checkpoint exists: {}",
                        meeting_id, e
                    );
                    inner
                        .notify(Notice::error(
                            &meeting_id,
                            "Final mix failed and no checkpoint exists; the recording is lost",
                        ))
                        .await;
                    Err(e)
                }
            }
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
