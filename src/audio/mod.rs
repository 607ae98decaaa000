pub mod frame;
pub mod mix;
pub mod wav;

pub use frame::{Frame, ParticipantId};
pub use mix::{decode_mono, mix, MixResult, MixSpec, ParticipantTotal, ParticipantTrack};
pub use wav::{encode_wav_bytes, write_wav_file, WavInfo};
