// WAV container encoding for checkpoints and final artifacts.
//
// Every artifact this crate writes is a self-contained mono 16-bit WAV that
// can be decoded without the live session: sample rate, channel count, and
// bit depth all travel in the header.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::info;

use crate::error::Result;

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write mixed mono samples to a WAV file at `path`.
pub fn write_wav_file(path: impl AsRef<Path>, samples: &[i16], sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WavWriter::create(path, mono_spec(sample_rate))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    info!(
        "Wrote {} ({} samples, {:.1}s)",
        path.display(),
        samples.len(),
        samples.len() as f64 / sample_rate as f64
    );

    Ok(())
}

/// Encode mixed mono samples as WAV bytes in memory.
pub fn encode_wav_bytes(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let cursor = Cursor::new(&mut bytes);
        let mut writer = WavWriter::new(cursor, mono_spec(sample_rate))?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(bytes)
}

/// Header-level facts about a WAV file on disk.
#[derive(Debug, Clone)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_seconds: f64,
}

impl WavInfo {
    /// Read the header of a WAV file without loading its samples. Used to
    /// confirm a checkpoint is independently decodable before handing it
    /// out as a fallback artifact.
    pub fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let reader = WavReader::open(path.as_ref())?;
        let spec = reader.spec();
        let duration_seconds = reader.duration() as f64 / spec.sample_rate as f64;

        Ok(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            duration_seconds,
        })
    }
}
