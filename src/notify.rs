// Operator-facing notices.
//
// Recording problems fall into two buckets: conditions a person should hear
// about (nothing captured, duration divergence, prolonged silence) and
// conditions that only matter in logs. The session emits the former through
// a Notifier so deployments can route them to chat, a bus, or anywhere else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// A human-readable message about a recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub meeting_id: String,
    pub severity: NoticeSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(
        meeting_id: impl Into<String>,
        severity: NoticeSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn info(meeting_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(meeting_id, NoticeSeverity::Info, message)
    }

    pub fn warning(meeting_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(meeting_id, NoticeSeverity::Warning, message)
    }

    pub fn error(meeting_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(meeting_id, NoticeSeverity::Error, message)
    }
}

/// Sink for operator notices. Implementations must not block the caller
/// for long; delivery failures are logged, never surfaced to recording.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice);
}

/// Default sink: write notices to the service log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: Notice) {
        match notice.severity {
            NoticeSeverity::Info => {
                info!("[{}] {}", notice.meeting_id, notice.message);
            }
            NoticeSeverity::Warning | NoticeSeverity::Error => {
                warn!("[{}] {}", notice.meeting_id, notice.message);
            }
        }
    }
}
