// Integration tests for durable checkpoints
//
// These tests verify that the checkpoint manager renders buffer snapshots
// to disk, rotates files so exactly one checkpoint survives, and leaves no
// temporary files behind.

use anyhow::Result;
use meeting_recorder::{BufferStore, CheckpointManager, MixSpec, ParticipantId, WavInfo};
use tempfile::TempDir;

fn spec() -> MixSpec {
    MixSpec {
        sample_rate: 1000,
        channels: 1,
    }
}

fn pcm(value: i16, count: usize) -> Vec<u8> {
    value.to_le_bytes().repeat(count)
}

fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_checkpoint_is_skipped_when_nothing_was_captured() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let manager =
        CheckpointManager::new("cp-test".to_string(), temp_dir.path().to_path_buf(), spec())?;
    let store = BufferStore::new(1000, 1);

    let written = manager.write_if_data(&store).await?;

    assert!(written.is_none(), "empty store must not produce a file");
    assert_eq!(manager.written_count(), 0);
    assert!(manager.latest().is_none());
    assert!(dir_entries(temp_dir.path()).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_checkpoint_lands_as_a_complete_wav() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let manager =
        CheckpointManager::new("cp-test".to_string(), temp_dir.path().to_path_buf(), spec())?;
    let store = BufferStore::new(1000, 1);

    // Three seconds from one participant, one second from another.
    store.append(ParticipantId(1), Some("alice"), &pcm(900, 3000), 0);
    store.append(ParticipantId(2), None, &pcm(-300, 1000), 0);

    let info = manager
        .write_if_data(&store)
        .await?
        .expect("store has data, checkpoint expected");

    assert_eq!(info.seq, 1);
    assert_eq!(info.participant_count, 2);
    assert_eq!(info.total_bytes, 8000);
    assert!((info.audio_duration_secs - 3.0).abs() < 1e-9);
    assert!(info.path.exists());

    // The file on disk is a decodable snapshot, and the temporary name
    // it was staged under is gone.
    let probed = WavInfo::probe(&info.path)?;
    assert!((probed.duration_seconds - 3.0).abs() < 1e-9);
    assert_eq!(dir_entries(temp_dir.path()), vec!["cp-test-checkpoint-001.wav"]);

    Ok(())
}

#[tokio::test]
async fn test_new_checkpoint_supersedes_the_previous_one() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let manager =
        CheckpointManager::new("cp-test".to_string(), temp_dir.path().to_path_buf(), spec())?;
    let store = BufferStore::new(1000, 1);

    store.append(ParticipantId(1), None, &pcm(500, 1000), 0);
    let first = manager.write_if_data(&store).await?.expect("first write");

    // More audio arrives; the next interval captures a longer snapshot.
    store.append(ParticipantId(1), None, &pcm(500, 2000), 0);
    let second = manager.write_if_data(&store).await?.expect("second write");

    assert_eq!(second.seq, 2);
    assert!((second.audio_duration_secs - 3.0).abs() < 1e-9);
    assert!(second.path.exists());
    assert!(
        !first.path.exists(),
        "superseded checkpoint must be removed once the new one is durable"
    );
    assert_eq!(manager.written_count(), 2);
    assert_eq!(manager.latest().map(|c| c.seq), Some(2));
    assert_eq!(dir_entries(temp_dir.path()), vec!["cp-test-checkpoint-002.wav"]);

    Ok(())
}

#[tokio::test]
async fn test_remove_last_clears_the_surviving_checkpoint() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let manager =
        CheckpointManager::new("cp-test".to_string(), temp_dir.path().to_path_buf(), spec())?;
    let store = BufferStore::new(1000, 1);

    store.append(ParticipantId(1), None, &pcm(100, 500), 0);
    let info = manager.write_if_data(&store).await?.expect("write");
    assert!(info.path.exists());

    manager.remove_last();

    assert!(!info.path.exists());
    assert!(manager.latest().is_none());
    assert!(dir_entries(temp_dir.path()).is_empty());

    Ok(())
}
