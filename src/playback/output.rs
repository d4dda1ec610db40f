use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::audio::AudioClip;
use crate::error::SessionResult;

pub type PlaybackId = u64;

/// Notifications sent by an output back to the playback controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The clip played to its natural end
    Finished(PlaybackId),
}

/// One in-flight playback
///
/// Dropping the handle releases it; implementations must stop emitting events
/// once dropped or stopped.
pub trait PlaybackHandle: Send {
    /// Suspend, keeping the position
    fn pause(&mut self);

    /// Continue from the current position
    fn resume(&mut self);

    /// Halt and rewind to the start
    fn stop(&mut self);

    fn position(&self) -> Duration;
}

/// Audio sink able to start playbacks
pub trait AudioOutput: Send {
    /// Start playing `clip`; `Finished(id)` must be sent on natural end
    fn start(
        &mut self,
        id: PlaybackId,
        clip: &AudioClip,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> SessionResult<Box<dyn PlaybackHandle>>;

    fn name(&self) -> &str;
}

/// Headless output: tracks the clip's real duration on the tokio clock and
/// optionally writes each clip to a spool directory for an external player
pub struct TimedOutput {
    spool_dir: Option<PathBuf>,
}

impl TimedOutput {
    pub fn new(spool_dir: Option<PathBuf>) -> Self {
        Self { spool_dir }
    }

    fn spool(&self, id: PlaybackId, clip: &AudioClip) {
        let Some(dir) = &self.spool_dir else {
            return;
        };

        let path = dir.join(format!(
            "reply-{}-{:03}.{}",
            chrono::Utc::now().format("%Y%m%d-%H%M%S"),
            id,
            clip.extension()
        ));

        let result = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, &clip.bytes));
        match result {
            Ok(()) => info!("Spooled reply audio to {}", path.display()),
            Err(e) => warn!("Failed to spool reply audio to {}: {}", path.display(), e),
        }
    }
}

impl Default for TimedOutput {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AudioOutput for TimedOutput {
    fn start(
        &mut self,
        id: PlaybackId,
        clip: &AudioClip,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> SessionResult<Box<dyn PlaybackHandle>> {
        let duration = clip.duration()?;
        self.spool(id, clip);

        let mut handle = TimedHandle {
            id,
            duration,
            played: Duration::ZERO,
            started_at: None,
            timer: None,
            events,
        };
        handle.resume();

        debug!("Playback {} started ({:.1}s)", id, duration.as_secs_f64());
        Ok(Box::new(handle))
    }

    fn name(&self) -> &str {
        "timed"
    }
}

struct TimedHandle {
    id: PlaybackId,
    duration: Duration,
    /// Position accumulated before the current run
    played: Duration,
    started_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl TimedHandle {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl PlaybackHandle for TimedHandle {
    fn pause(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.played = (self.played + started.elapsed()).min(self.duration);
        }
        self.cancel_timer();
    }

    fn resume(&mut self) {
        if self.started_at.is_some() {
            return;
        }

        let remaining = self.duration.saturating_sub(self.played);
        let events = self.events.clone();
        let id = self.id;

        self.started_at = Some(Instant::now());
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            let _ = events.send(PlaybackEvent::Finished(id));
        }));
    }

    fn stop(&mut self) {
        self.cancel_timer();
        self.started_at = None;
        self.played = Duration::ZERO;
    }

    fn position(&self) -> Duration {
        let running = self.started_at.map(|s| s.elapsed()).unwrap_or_default();
        (self.played + running).min(self.duration)
    }
}

impl Drop for TimedHandle {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
