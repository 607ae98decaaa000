use std::sync::Arc;

use anyhow::{Context, Result};
use async_nats::Client;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::messages::{FrameMessage, TransportEventMessage};
use crate::notify::{Notice, Notifier};
use crate::session::RecordingSession;

#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Subscribe to participant audio frames for one meeting
    pub async fn subscribe_frames(&self, meeting_id: &str) -> Result<async_nats::Subscriber> {
        let subject = frames_subject(meeting_id);
        info!("Subscribing to audio frames on {}", subject);

        self.client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to audio frames")
    }

    /// Subscribe to transport connectivity events for one meeting
    pub async fn subscribe_events(&self, meeting_id: &str) -> Result<async_nats::Subscriber> {
        let subject = events_subject(meeting_id);
        info!("Subscribing to transport events on {}", subject);

        self.client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to transport events")
    }

    /// Publish an operator notice for one meeting
    pub async fn publish_notice(&self, notice: &Notice) -> Result<()> {
        let subject = notices_subject(&notice.meeting_id);
        let payload = serde_json::to_vec(notice)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish notice")?;

        debug!("Published {:?} notice to {}", notice.severity, subject);
        Ok(())
    }
}

fn frames_subject(meeting_id: &str) -> String {
    format!("voice.frames.{}", meeting_id)
}

fn events_subject(meeting_id: &str) -> String {
    format!("voice.events.{}", meeting_id)
}

fn notices_subject(meeting_id: &str) -> String {
    format!("meeting.notices.{}", meeting_id)
}

/// Notifier that puts notices on the message bus. Publish failures are
/// logged and swallowed; notices must never take a recording down.
pub struct NatsNotifier {
    client: NatsClient,
}

impl NatsNotifier {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Notifier for NatsNotifier {
    async fn notify(&self, notice: Notice) {
        if let Err(e) = self.client.publish_notice(&notice).await {
            warn!("Failed to publish notice for {}: {}", notice.meeting_id, e);
        }
    }
}

/// Forward one meeting's bus traffic into its recording session.
///
/// Frames that fail to parse are logged and skipped; they never stop the
/// bridge or the session. The task runs until `shutdown` fires.
pub fn spawn_bridge(
    client: &NatsClient,
    session: Arc<RecordingSession>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let client = client.clone();
    tokio::spawn(async move {
        if let Err(e) = run_bridge(client, session, shutdown).await {
            warn!("Audio bridge exited with error: {}", e);
        }
    })
}

async fn run_bridge(
    client: NatsClient,
    session: Arc<RecordingSession>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut frames = client.subscribe_frames(session.meeting_id()).await?;
    let mut events = client.subscribe_events(session.meeting_id()).await?;

    info!("Audio bridge running for meeting {}", session.meeting_id());

    loop {
        tokio::select! {
            Some(msg) = frames.next() => {
                match serde_json::from_slice::<FrameMessage>(&msg.payload) {
                    Ok(message) if message.meeting_id == session.meeting_id() => {
                        match message.into_frame() {
                            Ok(frame) => session.ingest(frame),
                            Err(e) => warn!("Dropping undecodable frame: {}", e),
                        }
                    }
                    Ok(message) => {
                        debug!("Ignoring frame for other meeting {}", message.meeting_id);
                    }
                    Err(e) => warn!("Dropping unparseable frame message: {}", e),
                }
            }
            Some(msg) = events.next() => {
                match serde_json::from_slice::<TransportEventMessage>(&msg.payload) {
                    Ok(message) if message.meeting_id == session.meeting_id() => {
                        session.observe_transport(message.event).await;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Dropping unparseable transport event: {}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Audio bridge stopped for meeting {}", session.meeting_id());
    Ok(())
}
