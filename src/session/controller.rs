use chrono::Utc;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::events::SessionEvent;
use super::sequence::{RequestId, RequestTracker};
use super::state::{ConversationState, Message};
use super::stats::{Counters, SessionStats};
use crate::api::{AssistantBackend, VoiceAnswer};
use crate::audio::{AudioBackend, AudioClip, VoiceClip, VoiceRecorder};
use crate::error::{SessionError, SessionResult};
use crate::export::TranscriptExport;
use crate::playback::{AudioOutput, PlaybackController, PlaybackEvent, PlaybackId};

/// Result of a background request, delivered back to the controller
enum Completion {
    Answer {
        seq: RequestId,
        result: SessionResult<String>,
    },
    Voice {
        seq: RequestId,
        result: SessionResult<VoiceAnswer>,
    },
    Speech {
        seq: RequestId,
        result: SessionResult<AudioClip>,
    },
}

/// How a turn ended, as returned by `await_turn`
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Answer(String),
    Voice(VoiceAnswer),
}

/// Owns the conversation and mediates every interaction with the backend,
/// the microphone and the playback output
///
/// All mutation happens through `&mut self`. Network work runs on spawned
/// tasks; their results come back over a channel and are applied by
/// `next_event`, newest request wins.
pub struct SessionController {
    config: SessionConfig,
    state: ConversationState,
    backend: Arc<dyn AssistantBackend>,
    microphone: Option<Box<dyn AudioBackend>>,
    recording: Option<JoinHandle<SessionResult<VoiceClip>>>,
    playback: PlaybackController,
    requests: RequestTracker,
    in_flight: usize,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    started_at: chrono::DateTime<Utc>,
    counters: Counters,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn AssistantBackend>,
        output: Box<dyn AudioOutput>,
    ) -> Self {
        info!(
            "Creating conversation session: {} (backend: {})",
            config.session_id,
            backend.name()
        );

        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Self {
            config,
            state: ConversationState::new(),
            backend,
            microphone: None,
            recording: None,
            playback: PlaybackController::new(output),
            requests: RequestTracker::new(),
            in_flight: 0,
            completions_tx,
            completions_rx,
            started_at: Utc::now(),
            counters: Counters::default(),
        }
    }

    pub fn with_microphone(mut self, microphone: Box<dyn AudioBackend>) -> Self {
        self.microphone = Some(microphone);
        self
    }

    /// Swap the capture device; refused while a recording is running
    pub fn set_microphone(&mut self, microphone: Box<dyn AudioBackend>) -> SessionResult<()> {
        if self.recording.is_some() {
            return Err(SessionError::AlreadyRecording);
        }
        debug!("Microphone set to {}", microphone.name());
        self.microphone = Some(microphone);
        Ok(())
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.state.set_draft(draft.into());
    }

    // ------------------------------------------------------------------
    // Text questions
    // ------------------------------------------------------------------

    /// Send the current draft
    ///
    /// Returns `None` without touching anything when the draft is blank.
    pub fn submit_draft(&mut self) -> Option<RequestId> {
        let Some(text) = self.state.take_draft() else {
            debug!("Ignoring blank draft");
            return None;
        };

        self.state.push(Message::user(text.clone()));
        self.state.set_typing(true);

        let seq = self.requests.issue();
        info!("Asking {} ({} chars)", seq, text.len());

        let backend = Arc::clone(&self.backend);
        let session_id = self.config.session_id.clone();
        self.spawn_request(async move {
            let result = backend.ask(&session_id, &text).await;
            Completion::Answer { seq, result }
        });

        Some(seq)
    }

    /// Submit `text` and wait for its answer
    pub async fn ask(&mut self, text: &str) -> SessionResult<String> {
        self.set_draft(text);
        let seq = self.submit_draft().ok_or(SessionError::EmptyInput)?;

        match self.await_turn(seq).await? {
            TurnOutcome::Answer(text) => Ok(text),
            TurnOutcome::Voice(answer) => Ok(answer.resp_text),
        }
    }

    // ------------------------------------------------------------------
    // Voice questions
    // ------------------------------------------------------------------

    /// Idle -> Recording
    pub async fn start_recording(&mut self) -> SessionResult<()> {
        if !self.config.features.enable_voice {
            return Err(SessionError::FeatureDisabled("voice input"));
        }

        if self.recording.is_some() {
            warn!("Recording already started");
            return Err(SessionError::AlreadyRecording);
        }

        let microphone = self
            .microphone
            .as_mut()
            .ok_or_else(|| SessionError::MicrophoneUnavailable("no microphone attached".to_string()))?;

        let audio_rx = match microphone.start().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to acquire microphone {}: {}", microphone.name(), e);
                return Err(e);
            }
        };

        let recorder = VoiceRecorder::new(self.config.audio.clone());
        self.recording = Some(tokio::spawn(recorder.record(audio_rx)));
        self.state.set_recording(true);

        info!("Recording started on {}", microphone.name());
        Ok(())
    }

    /// Recording -> Processing
    ///
    /// The microphone is released before anything is uploaded, whatever
    /// happens afterwards.
    pub async fn stop_recording(&mut self) -> SessionResult<RequestId> {
        let Some(recorder) = self.recording.take() else {
            warn!("Recording not active");
            return Err(SessionError::NotRecording);
        };

        if let Some(microphone) = self.microphone.as_mut() {
            if let Err(e) = microphone.stop().await {
                error!("Failed to release microphone {}: {}", microphone.name(), e);
            }
        }
        self.state.set_recording(false);

        let clip = match recorder.await {
            Ok(Ok(clip)) => clip,
            Ok(Err(e)) => {
                warn!("Recording discarded: {}", e);
                return Err(e);
            }
            Err(e) => {
                error!("Recorder task panicked: {}", e);
                return Err(SessionError::Audio(e.to_string()));
            }
        };

        self.state.set_typing(true);
        let seq = self.requests.issue();
        info!(
            "Uploading voice question {} ({:.1}s, {} bytes)",
            seq,
            clip.duration_ms as f64 / 1000.0,
            clip.wav.len()
        );

        let backend = Arc::clone(&self.backend);
        let session_id = self.config.session_id.clone();
        self.spawn_request(async move {
            let result = backend.ask_voice(&session_id, &clip).await;
            Completion::Voice { seq, result }
        });

        Ok(seq)
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Play a clip, stopping whatever was playing before
    pub fn play(&mut self, clip: &AudioClip) -> SessionResult<PlaybackId> {
        let result = self.playback.play(clip);
        self.sync_speaking();

        if let Err(e) = &result {
            error!("Playback failed: {}", e);
        }
        result
    }

    pub fn pause_playback(&mut self) -> bool {
        let changed = self.playback.pause();
        self.sync_speaking();
        changed
    }

    pub fn resume_playback(&mut self) -> bool {
        let changed = self.playback.resume();
        self.sync_speaking();
        changed
    }

    pub fn stop_playback(&mut self) -> bool {
        let changed = self.playback.stop();
        self.sync_speaking();
        changed
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    fn sync_speaking(&mut self) {
        self.state.set_agent_speaking(self.playback.is_playing());
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// True while a request is in flight or audio is playing
    pub fn has_pending_work(&self) -> bool {
        self.in_flight > 0 || self.playback.is_playing()
    }

    /// Wait for the next completion or playback notification and apply it
    ///
    /// Waits forever when nothing is pending; check `has_pending_work` first
    /// or race it against other input. Cancel safe.
    pub async fn next_event(&mut self) -> SessionEvent {
        loop {
            let applied = tokio::select! {
                Some(completion) = self.completions_rx.recv() => self.apply_completion(completion),
                Some(event) = self.playback.next_event() => self.apply_playback_event(event),
            };

            if let Some(event) = applied {
                return event;
            }
        }
    }

    /// Drive events until no request is in flight and nothing is playing
    pub async fn run_until_idle(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while self.has_pending_work() {
            events.push(self.next_event().await);
        }
        events
    }

    /// Drive events until the turn `seq` has been applied
    pub async fn await_turn(&mut self, seq: RequestId) -> SessionResult<TurnOutcome> {
        loop {
            if !self.requests.is_latest(seq) {
                return Err(SessionError::Superseded(seq.to_string()));
            }

            match self.next_event().await {
                SessionEvent::AnswerReceived { seq: s, text } if s == seq => {
                    return Ok(TurnOutcome::Answer(text))
                }
                SessionEvent::VoiceTurnCompleted { seq: s, answer } if s == seq => {
                    return Ok(TurnOutcome::Voice(answer))
                }
                SessionEvent::RequestFailed { seq: s, error } if s == seq => return Err(error),
                _ => continue,
            }
        }
    }

    fn spawn_request<F>(&mut self, request: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let completions_tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let _ = completions_tx.send(request.await);
        });
    }

    fn apply_completion(&mut self, completion: Completion) -> Option<SessionEvent> {
        self.in_flight = self.in_flight.saturating_sub(1);

        match completion {
            Completion::Answer { seq, result } => {
                if !self.requests.is_latest(seq) {
                    return Some(self.discard(seq));
                }
                self.state.set_typing(false);

                match result {
                    Ok(text) => {
                        info!("Answer {} received ({} chars)", seq, text.len());
                        self.state.push(Message::agent(text.clone()));
                        self.counters.turns_completed += 1;
                        self.request_speech(seq, text.clone());
                        Some(SessionEvent::AnswerReceived { seq, text })
                    }
                    Err(error) => Some(self.fail(seq, error)),
                }
            }

            Completion::Voice { seq, result } => {
                if !self.requests.is_latest(seq) {
                    return Some(self.discard(seq));
                }
                self.state.set_typing(false);

                match result {
                    Ok(answer) => {
                        info!(
                            "Voice answer {} received (heard: {:?})",
                            seq, answer.user_text
                        );
                        self.state.push(Message::user(answer.user_text.clone()));
                        self.state.push(Message::agent(answer.resp_text.clone()));
                        self.counters.turns_completed += 1;

                        if let Some(audio_url) = answer.audio_url.clone() {
                            let backend = Arc::clone(&self.backend);
                            self.spawn_request(async move {
                                let result = backend.fetch_audio(&audio_url).await;
                                Completion::Speech { seq, result }
                            });
                        }

                        Some(SessionEvent::VoiceTurnCompleted { seq, answer })
                    }
                    Err(error) => Some(self.fail(seq, error)),
                }
            }

            Completion::Speech { seq, result } => {
                if !self.requests.is_latest(seq) {
                    return Some(self.discard(seq));
                }

                match result.and_then(|clip| self.play(&clip)) {
                    Ok(id) => Some(SessionEvent::PlaybackStarted { id }),
                    Err(error) => {
                        warn!("No speech for turn {}: {}", seq, error);
                        self.sync_speaking();
                        Some(SessionEvent::PlaybackFailed { error })
                    }
                }
            }
        }
    }

    fn apply_playback_event(&mut self, event: PlaybackEvent) -> Option<SessionEvent> {
        match event {
            PlaybackEvent::Finished(id) => {
                let current = self.playback.handle_finished(id);
                self.sync_speaking();
                current.then_some(SessionEvent::PlaybackFinished { id })
            }
        }
    }

    fn request_speech(&mut self, seq: RequestId, text: String) {
        if text.trim().is_empty() {
            return;
        }

        let backend = Arc::clone(&self.backend);
        self.spawn_request(async move {
            let result = backend.synthesize(&text).await;
            Completion::Speech { seq, result }
        });
    }

    fn discard(&mut self, seq: RequestId) -> SessionEvent {
        warn!(
            "Discarding response {} (latest is {:?})",
            seq,
            self.requests.latest()
        );
        self.counters.stale_responses += 1;
        SessionEvent::StaleResponseDiscarded { seq }
    }

    fn fail(&mut self, seq: RequestId, error: SessionError) -> SessionEvent {
        error!("Request {} failed: {}", seq, error);
        self.counters.failed_requests += 1;
        SessionEvent::RequestFailed { seq, error }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Write the transcript as JSON; `path` defaults to the export directory
    pub fn export_transcript(&self, path: Option<&Path>) -> SessionResult<PathBuf> {
        if !self.config.features.enable_export {
            return Err(SessionError::FeatureDisabled("transcript export"));
        }

        let export = TranscriptExport::new(&self.config.session_id, &self.state);
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.config.export_dir.join(export.file_name()),
        };

        export.write_to(&path)
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            session_id: self.config.session_id.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            message_count: self.state.messages().len(),
            turns_completed: self.counters.turns_completed,
            failed_requests: self.counters.failed_requests,
            stale_responses: self.counters.stale_responses,
            is_recording: self.state.is_recording(),
            is_agent_speaking: self.state.is_agent_speaking(),
        }
    }

    /// End the session: release the microphone and playback, forget the
    /// conversation and ignore anything still in flight
    pub async fn end_session(&mut self) -> SessionStats {
        info!("Ending conversation session: {}", self.config.session_id);

        if let Some(recorder) = self.recording.take() {
            if let Some(microphone) = self.microphone.as_mut() {
                if let Err(e) = microphone.stop().await {
                    error!("Failed to release microphone {}: {}", microphone.name(), e);
                }
            }
            recorder.abort();
        }

        self.playback.release();
        self.requests.invalidate();

        let stats = self.stats();
        self.state.reset();
        self.counters = Counters::default();
        self.started_at = Utc::now();
        stats
    }
}
