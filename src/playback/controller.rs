use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::output::{AudioOutput, PlaybackEvent, PlaybackHandle, PlaybackId};
use crate::audio::AudioClip;
use crate::error::SessionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    /// Halted and rewound; the handle is kept so it can be replayed
    Stopped,
}

struct ActivePlayback {
    id: PlaybackId,
    handle: Box<dyn PlaybackHandle>,
    state: PlaybackState,
}

/// Owns the single playback handle
///
/// Starting a new clip always stops and releases the previous handle first.
pub struct PlaybackController {
    output: Box<dyn AudioOutput>,
    active: Option<ActivePlayback>,
    next_id: PlaybackId,
    events_tx: mpsc::UnboundedSender<PlaybackEvent>,
    events_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            output,
            active: None,
            next_id: 1,
            events_tx,
            events_rx,
        }
    }

    pub fn play(&mut self, clip: &AudioClip) -> SessionResult<PlaybackId> {
        self.release();

        let id = self.next_id;
        self.next_id += 1;

        let handle = self.output.start(id, clip, self.events_tx.clone())?;
        self.active = Some(ActivePlayback {
            id,
            handle,
            state: PlaybackState::Playing,
        });

        info!("Playback {} started on {} output", id, self.output.name());
        Ok(id)
    }

    /// Returns false when nothing is playing
    pub fn pause(&mut self) -> bool {
        match &mut self.active {
            Some(active) if active.state == PlaybackState::Playing => {
                active.handle.pause();
                active.state = PlaybackState::Paused;
                debug!("Playback {} paused at {:?}", active.id, active.handle.position());
                true
            }
            _ => false,
        }
    }

    pub fn resume(&mut self) -> bool {
        match &mut self.active {
            Some(active) if active.state != PlaybackState::Playing => {
                active.handle.resume();
                active.state = PlaybackState::Playing;
                debug!("Playback {} resumed", active.id);
                true
            }
            _ => false,
        }
    }

    pub fn stop(&mut self) -> bool {
        match &mut self.active {
            Some(active) if active.state != PlaybackState::Stopped => {
                active.handle.stop();
                active.state = PlaybackState::Stopped;
                debug!("Playback {} stopped", active.id);
                true
            }
            _ => false,
        }
    }

    /// Stop and drop the current handle, if any
    pub fn release(&mut self) {
        if let Some(mut previous) = self.active.take() {
            previous.handle.stop();
            debug!("Playback {} released", previous.id);
        }
    }

    /// Apply a natural end-of-audio; stale notifications are ignored
    pub fn handle_finished(&mut self, id: PlaybackId) -> bool {
        let current = matches!(
            &self.active,
            Some(active) if active.id == id && active.state == PlaybackState::Playing
        );

        if current {
            self.active = None;
            info!("Playback {} finished", id);
        } else {
            debug!("Ignoring finish for playback {}", id);
        }
        current
    }

    /// Wait for the next notification from the output
    pub async fn next_event(&mut self) -> Option<PlaybackEvent> {
        self.events_rx.recv().await
    }

    pub fn is_playing(&self) -> bool {
        self.state() == Some(PlaybackState::Playing)
    }

    pub fn state(&self) -> Option<PlaybackState> {
        self.active.as_ref().map(|a| a.state)
    }

    pub fn active_id(&self) -> Option<PlaybackId> {
        self.active.as_ref().map(|a| a.id)
    }

    pub fn position(&self) -> Option<Duration> {
        self.active.as_ref().map(|a| a.handle.position())
    }
}
