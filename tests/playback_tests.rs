// Integration tests for the playback controller over the headless output
//
// All tests run on a paused tokio clock; a half-second clip finishes after
// exactly 500ms of virtual time.

mod common;

use common::{speech_clip, wav_bytes};
use salesbuddy::playback::{PlaybackController, PlaybackEvent, PlaybackState, TimedOutput};
use salesbuddy::{AudioClip, SessionError};
use std::time::Duration;
use tokio::time::{advance, timeout};

fn clip() -> AudioClip {
    AudioClip::new(speech_clip(), Some("audio/wav".to_string()))
}

fn controller() -> PlaybackController {
    PlaybackController::new(Box::new(TimedOutput::default()))
}

#[tokio::test(start_paused = true)]
async fn test_clip_finishes_after_its_duration() {
    let mut playback = controller();
    let id = playback.play(&clip()).unwrap();
    assert!(playback.is_playing());

    // Let the timer task arm itself
    tokio::task::yield_now().await;
    advance(Duration::from_millis(400)).await;
    assert!(
        timeout(Duration::from_millis(50), playback.next_event())
            .await
            .is_err(),
        "Should not finish early"
    );

    let event = playback.next_event().await.unwrap();
    assert_eq!(event, PlaybackEvent::Finished(id));
    assert!(playback.handle_finished(id));
    assert!(!playback.is_playing());
    assert_eq!(playback.active_id(), None);
}

#[tokio::test(start_paused = true)]
async fn test_pause_keeps_position() {
    let mut playback = controller();
    let id = playback.play(&clip()).unwrap();

    advance(Duration::from_millis(200)).await;
    assert!(playback.pause());
    assert_eq!(playback.state(), Some(PlaybackState::Paused));
    assert_eq!(playback.position(), Some(Duration::from_millis(200)));

    // Time spent paused doesn't count
    advance(Duration::from_secs(5)).await;
    assert_eq!(playback.position(), Some(Duration::from_millis(200)));
    assert!(!playback.pause(), "Already paused");

    assert!(playback.resume());
    let event = playback.next_event().await.unwrap();
    assert_eq!(event, PlaybackEvent::Finished(id));
}

#[tokio::test(start_paused = true)]
async fn test_stop_rewinds_and_keeps_handle() {
    let mut playback = controller();
    let id = playback.play(&clip()).unwrap();

    advance(Duration::from_millis(300)).await;
    assert!(playback.stop());

    assert_eq!(playback.state(), Some(PlaybackState::Stopped));
    assert_eq!(playback.active_id(), Some(id));
    assert_eq!(playback.position(), Some(Duration::ZERO));
    assert!(!playback.is_playing());
    assert!(!playback.stop());

    // No finish event is emitted for a stopped clip
    assert!(timeout(Duration::from_secs(2), playback.next_event())
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_replacing_clip_ignores_old_finish() {
    let mut playback = controller();
    let first = playback.play(&clip()).unwrap();
    let second = playback.play(&clip()).unwrap();

    assert_ne!(first, second);
    assert_eq!(playback.active_id(), Some(second));
    assert!(!playback.handle_finished(first));
    assert!(playback.is_playing());

    let event = playback.next_event().await.unwrap();
    assert_eq!(event, PlaybackEvent::Finished(second));
}

#[tokio::test(start_paused = true)]
async fn test_unplayable_clip_is_rejected() {
    let mut playback = controller();
    let garbage = AudioClip::new(b"not audio at all".to_vec(), None);

    let result = playback.play(&garbage);

    assert!(matches!(result, Err(SessionError::Playback(_))));
    assert_eq!(playback.state(), None);
}

#[tokio::test(start_paused = true)]
async fn test_spool_dir_receives_clip() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let spool = temp_dir.path().join("replies");
    let mut playback =
        PlaybackController::new(Box::new(TimedOutput::new(Some(spool.clone()))));

    let bytes = wav_bytes(&[0i16; 1600], 16000, 1);
    playback
        .play(&AudioClip::new(bytes.clone(), Some("audio/wav".to_string())))
        .unwrap();

    let files: Vec<_> = std::fs::read_dir(&spool)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].extension().unwrap(), "wav");
    assert_eq!(std::fs::read(&files[0]).unwrap(), bytes);
}
