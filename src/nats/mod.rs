pub mod client;
pub mod messages;

pub use client::{spawn_bridge, NatsClient, NatsNotifier};
pub use messages::{FrameMessage, TransportEventMessage};
