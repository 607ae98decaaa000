// Session health watchdog.
//
// One task per recording session. On a short cadence it checks that frames
// are still flowing and that the controls agree with each other; on a longer
// cadence it asks the checkpoint manager for a durable write. Idle warnings
// fire once per threshold crossing, not once per tick, and reset as soon as
// audio resumes.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::session::SessionInner;
use crate::notify::Notice;

pub(crate) struct Watchdog {
    inner: Arc<SessionInner>,
    /// Full idle thresholds crossed at the time of the last warning.
    warned_periods: u64,
    /// Whether the never-any-audio advisory has been logged.
    noted_silence: bool,
    /// Whether the gate/phase skew defect has been reported.
    reported_skew: bool,
}

impl Watchdog {
    pub(crate) fn new(inner: Arc<SessionInner>) -> Self {
        Self {
            inner,
            warned_periods: 0,
            noted_silence: false,
            reported_skew: false,
        }
    }

    pub(crate) async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let health_every = self.inner.config.watchdog_interval;
        let checkpoint_every = self.inner.config.checkpoint_interval;

        let now = time::Instant::now();
        let mut health = time::interval_at(now + health_every, health_every);
        let mut checkpoint = time::interval_at(now + checkpoint_every, checkpoint_every);
        // A checkpoint can take longer than its interval; do not bunch up
        // the writes afterwards.
        checkpoint.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("Watchdog started for meeting {}", self.inner.meeting_id());

        loop {
            tokio::select! {
                _ = health.tick() => self.health_pass().await,
                _ = checkpoint.tick() => self.checkpoint_pass().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("Watchdog stopped for meeting {}", self.inner.meeting_id());
    }

    async fn health_pass(&mut self) {
        let phase = self.inner.phase();

        // The gate and the phase move together under the control lock;
        // seeing them disagree means the controller is wedged. That is a
        // defect, not an operational hiccup, and the user hears about it.
        if self.inner.halted() && phase.is_recording() {
            error!(
                "Session {} reports recording but its ingest gate is closed",
                self.inner.meeting_id()
            );
            if !self.reported_skew {
                self.reported_skew = true;
                self.inner
                    .notify(Notice::error(
                        self.inner.meeting_id(),
                        "Recorder defect: the session reports recording but its ingest gate is closed and frames are being refused",
                    ))
                    .await;
            }
            return;
        }
        if !phase.is_recording() {
            return;
        }

        let threshold = self.inner.config.idle_warning_after.as_secs_f64();
        match self.inner.idle_seconds() {
            None => {
                // No frame has ever arrived. Voice-activity gating makes
                // this normal for a quiet room.
                if !self.noted_silence && self.inner.seconds_since_start() >= threshold {
                    self.noted_silence = true;
                    info!(
                        "Meeting {} has been recording for {:.0}s without receiving any audio",
                        self.inner.meeting_id(),
                        self.inner.seconds_since_start()
                    );
                }
            }
            Some(idle) => {
                let periods = (idle / threshold) as u64;
                if periods == 0 {
                    self.warned_periods = 0;
                } else if periods > self.warned_periods {
                    self.warned_periods = periods;
                    warn!(
                        "Meeting {}: no audio frames for {:.0}s",
                        self.inner.meeting_id(),
                        idle
                    );
                    self.inner
                        .notify(Notice::warning(
                            self.inner.meeting_id(),
                            format!(
                                "No audio received for {:.0}s; the meeting may have gone quiet or the feed may be broken",
                                idle
                            ),
                        ))
                        .await;
                }
            }
        }
    }

    async fn checkpoint_pass(&self) {
        if !self.inner.phase().is_recording() {
            return;
        }

        if let Err(e) = self
            .inner
            .checkpoints
            .write_if_data(&self.inner.store)
            .await
        {
            error!(
                "Checkpoint failed for meeting {}; previous checkpoint kept: {}",
                self.inner.meeting_id(),
                e
            );
        }
    }
}
