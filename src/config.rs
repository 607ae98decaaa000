use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recording: RecordingConfig,
    pub nats: NatsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    /// Destination for checkpoints and final mixes; `~` is expanded
    pub output_dir: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub watchdog_interval_secs: u64,
    pub idle_warning_secs: u64,
    pub checkpoint_interval_secs: u64,
    pub duration_gap_tolerance_secs: u64,
    pub keep_last_checkpoint: bool,
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

impl RecordingConfig {
    /// Session settings for one meeting, with the shared knobs from the
    /// service config applied.
    pub fn session_config(&self, meeting_id: impl Into<String>) -> SessionConfig {
        SessionConfig {
            meeting_id: meeting_id.into(),
            output_dir: PathBuf::from(shellexpand::tilde(&self.output_dir).into_owned()),
            sample_rate: self.sample_rate,
            channels: self.channels,
            watchdog_interval: Duration::from_secs(self.watchdog_interval_secs),
            idle_warning_after: Duration::from_secs(self.idle_warning_secs),
            checkpoint_interval: Duration::from_secs(self.checkpoint_interval_secs),
            duration_gap_tolerance: Duration::from_secs(self.duration_gap_tolerance_secs),
            keep_last_checkpoint: self.keep_last_checkpoint,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
