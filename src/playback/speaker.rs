use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::output::{AudioOutput, PlaybackEvent, PlaybackHandle, PlaybackId};
use crate::audio::AudioClip;
use crate::error::{SessionError, SessionResult};

/// How often a playing sink is checked for end of audio
const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// Plays clips on the default output device via rodio
///
/// The rodio `OutputStream` is not `Send`; it is parked on its own thread
/// for as long as this output lives, and only the handle crosses threads.
pub struct SpeakerOutput {
    stream: OutputStreamHandle,
    _shutdown: std_mpsc::Sender<()>,
}

impl SpeakerOutput {
    pub fn open() -> SessionResult<Self> {
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("salesbuddy-speaker".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    // Returns once the output is dropped
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| SessionError::Playback(e.to_string()))?;

        let stream = ready_rx
            .recv()
            .map_err(|_| SessionError::Playback("speaker thread exited".to_string()))?
            .map_err(|e| SessionError::Playback(format!("no output device: {}", e)))?;

        info!("Speaker output opened");
        Ok(Self {
            stream,
            _shutdown: shutdown_tx,
        })
    }
}

impl AudioOutput for SpeakerOutput {
    fn start(
        &mut self,
        id: PlaybackId,
        clip: &AudioClip,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> SessionResult<Box<dyn PlaybackHandle>> {
        let mut handle = SpeakerHandle {
            id,
            stream: self.stream.clone(),
            bytes: Arc::from(clip.bytes.as_slice()),
            sink: None,
            played: Duration::ZERO,
            started_at: None,
            watcher: None,
            events,
        };
        handle.begin()?;

        debug!("Playback {} started on speaker", id);
        Ok(Box::new(handle))
    }

    fn name(&self) -> &str {
        "speaker"
    }
}

struct SpeakerHandle {
    id: PlaybackId,
    stream: OutputStreamHandle,
    bytes: Arc<[u8]>,
    /// `None` after `stop`; `resume` then plays from the start on a new sink
    sink: Option<Arc<Sink>>,
    played: Duration,
    started_at: Option<Instant>,
    watcher: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl SpeakerHandle {
    fn begin(&mut self) -> SessionResult<()> {
        let source = Decoder::new(Cursor::new(Arc::clone(&self.bytes)))
            .map_err(|e| SessionError::Playback(format!("unrecognized audio: {}", e)))?;
        let sink = Sink::try_new(&self.stream).map_err(|e| SessionError::Playback(e.to_string()))?;
        sink.append(source);

        let sink = Arc::new(sink);
        self.watcher = Some(watch(Arc::clone(&sink), self.id, self.events.clone()));
        self.sink = Some(sink);
        self.played = Duration::ZERO;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn cancel_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

/// Report `Finished(id)` once the sink has drained
fn watch(
    sink: Arc<Sink>,
    id: PlaybackId,
    events: mpsc::UnboundedSender<PlaybackEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(WATCH_INTERVAL);
        loop {
            tick.tick().await;
            if sink.empty() {
                let _ = events.send(PlaybackEvent::Finished(id));
                break;
            }
        }
    })
}

impl PlaybackHandle for SpeakerHandle {
    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        if let Some(started) = self.started_at.take() {
            self.played += started.elapsed();
        }
    }

    fn resume(&mut self) {
        if self.sink.is_none() {
            if let Err(e) = self.begin() {
                debug!("Playback {} could not restart: {}", self.id, e);
            }
            return;
        }

        if let Some(sink) = &self.sink {
            sink.play();
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        self.cancel_watcher();
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.started_at = None;
        self.played = Duration::ZERO;
    }

    fn position(&self) -> Duration {
        let running = self.started_at.map(|s| s.elapsed()).unwrap_or_default();
        self.played + running
    }
}

impl Drop for SpeakerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
