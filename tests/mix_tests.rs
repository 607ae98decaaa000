// Integration tests for participant mixing
//
// These tests verify the full mix pipeline: per-participant buffers with
// different lengths and join times are flattened into one mono track, peak
// normalization only kicks in when the sum leaves the 16-bit range, and the
// result lands on disk as a readable WAV file.

use anyhow::Result;
use meeting_recorder::{mix, write_wav_file, BufferStore, MixSpec, ParticipantId, WavInfo};
use tempfile::TempDir;

/// Mono s16le bytes holding `count` copies of `value`.
fn pcm(value: i16, count: usize) -> Vec<u8> {
    value.to_le_bytes().repeat(count)
}

#[test]
fn test_two_participants_with_late_joiner() -> Result<()> {
    // 1kHz mono keeps the sample math readable: 1 sample = 1ms.
    let store = BufferStore::new(1000, 1);

    // Participant 1 talks for the whole 10 seconds. Participant 2 joins
    // two seconds in and talks for six.
    store.append(ParticipantId(1), Some("alice"), &pcm(1000, 10_000), 0);
    store.append(ParticipantId(2), Some("bob"), &pcm(500, 6_000), 2_000);

    let mixed = mix(
        &store.snapshot(),
        MixSpec {
            sample_rate: 1000,
            channels: 1,
        },
    )?;

    // Output covers the longest participant timeline.
    assert_eq!(mixed.samples.len(), 10_000);
    assert!((mixed.audio_duration_secs() - 10.0).abs() < 1e-9);

    // Seconds 0-2: only participant 1. Seconds 2-8: both. Seconds 8-10:
    // participant 2's track is exhausted, silence fills the difference.
    assert_eq!(mixed.samples[0], 1000);
    assert_eq!(mixed.samples[1_999], 1000);
    assert_eq!(mixed.samples[2_000], 1500);
    assert_eq!(mixed.samples[7_999], 1500);
    assert_eq!(mixed.samples[8_000], 1000);
    assert_eq!(mixed.samples[9_999], 1000);

    // Peak stayed inside the 16-bit range, so no scaling happened.
    assert_eq!(mixed.peak, 1500);
    assert!(!mixed.scaled);

    // Byte totals are pure payload sums; the lead-in silence for the late
    // joiner is never counted as captured bytes.
    assert_eq!(mixed.participants.len(), 2);
    assert_eq!(mixed.participants[0].participant, ParticipantId(1));
    assert_eq!(mixed.participants[0].bytes, 20_000);
    assert_eq!(mixed.participants[1].participant, ParticipantId(2));
    assert_eq!(mixed.participants[1].bytes, 12_000);

    Ok(())
}

#[test]
fn test_loud_overlap_is_scaled_to_the_limit() -> Result<()> {
    let store = BufferStore::new(1000, 1);

    // Three participants at 20000 sum to 60000, well past i16::MAX.
    for id in 1..=3 {
        store.append(ParticipantId(id), None, &pcm(20_000, 100), 0);
    }

    let mixed = mix(
        &store.snapshot(),
        MixSpec {
            sample_rate: 1000,
            channels: 1,
        },
    )?;

    assert_eq!(mixed.peak, 60_000);
    assert!(mixed.scaled);

    // One uniform factor brings the loudest moment exactly onto the
    // 16-bit ceiling.
    assert_eq!(mixed.samples[0], i16::MAX);
    assert!(mixed.samples.iter().all(|&s| s == i16::MAX));

    Ok(())
}

#[test]
fn test_quiet_mix_is_left_untouched() -> Result<()> {
    let store = BufferStore::new(1000, 1);

    store.append(ParticipantId(1), None, &pcm(-120, 500), 0);
    store.append(ParticipantId(2), None, &pcm(80, 500), 0);

    let mixed = mix(
        &store.snapshot(),
        MixSpec {
            sample_rate: 1000,
            channels: 1,
        },
    )?;

    // Exact superposition, no normalization of a quiet recording.
    assert!(!mixed.scaled);
    assert!(mixed.samples.iter().all(|&s| s == -40));

    Ok(())
}

#[test]
fn test_stereo_input_is_averaged_to_mono() -> Result<()> {
    let store = BufferStore::new(1000, 2);

    // Interleaved L=300, R=100 for 250 sample pairs.
    let mut stereo = Vec::new();
    for _ in 0..250 {
        stereo.extend_from_slice(&300i16.to_le_bytes());
        stereo.extend_from_slice(&100i16.to_le_bytes());
    }
    store.append(ParticipantId(1), None, &stereo, 0);

    let mixed = mix(
        &store.snapshot(),
        MixSpec {
            sample_rate: 1000,
            channels: 2,
        },
    )?;

    assert_eq!(mixed.samples.len(), 250);
    assert!(mixed.samples.iter().all(|&s| s == 200));

    Ok(())
}

#[test]
fn test_mixed_output_lands_as_readable_wav() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = BufferStore::new(8000, 1);

    // Two seconds of audio at 8kHz.
    store.append(ParticipantId(1), None, &pcm(250, 16_000), 0);

    let mixed = mix(
        &store.snapshot(),
        MixSpec {
            sample_rate: 8000,
            channels: 1,
        },
    )?;

    let path = temp_dir.path().join("mixed.wav");
    write_wav_file(&path, &mixed.samples, mixed.sample_rate)?;

    // The artifact must be independently decodable.
    let info = WavInfo::probe(&path)?;
    assert_eq!(info.sample_rate, 8000);
    assert_eq!(info.channels, 1);
    assert!((info.duration_seconds - 2.0).abs() < 1e-9);

    Ok(())
}
