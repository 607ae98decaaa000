use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::config::RecordingConfig;
use crate::nats::NatsClient;
use crate::session::RecordingSession;

/// The bus bridge feeding one session, so it can be wound down on stop.
pub struct BridgeHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BridgeHandle {
    pub fn new(shutdown: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { shutdown, task }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// One running meeting: the session plus its bus bridge.
pub struct ActiveSession {
    pub session: Arc<RecordingSession>,
    pub bridge: Option<BridgeHandle>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active recording sessions (meeting_id → session)
    pub sessions: Arc<RwLock<HashMap<String, ActiveSession>>>,

    /// Session settings applied to every new meeting
    pub recording: Arc<RecordingConfig>,

    /// Bus connection shared by all sessions; None when running without
    /// a transport, in which case sessions only log their notices.
    pub nats: Option<NatsClient>,
}

impl AppState {
    pub fn new(recording: RecordingConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            recording: Arc::new(recording),
            nats: None,
        }
    }

    pub fn with_nats(recording: RecordingConfig, nats: NatsClient) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            recording: Arc::new(recording),
            nats: Some(nats),
        }
    }
}
