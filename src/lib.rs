pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod notify;
pub mod session;

pub use audio::{
    decode_mono, encode_wav_bytes, mix, write_wav_file, Frame, MixResult, MixSpec, ParticipantId,
    ParticipantTotal, ParticipantTrack, WavInfo,
};
pub use config::Config;
pub use error::RecorderError;
pub use http::{create_router, AppState};
pub use nats::{spawn_bridge, FrameMessage, NatsClient, NatsNotifier, TransportEventMessage};
pub use notify::{LogNotifier, Notice, NoticeSeverity, Notifier};
pub use session::{
    ArtifactKind, BufferStore, CheckpointInfo, CheckpointManager, RecordingArtifact,
    RecordingSession, SessionConfig, SessionPhase, SessionStatus, TransportEvent,
};
