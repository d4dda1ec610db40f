// Shared fakes for session tests: a scripted backend, a countable
// microphone and a playback output that records what it was asked to do.

#![allow(dead_code)]

use salesbuddy::api::{AssistantBackend, VoiceAnswer};
use salesbuddy::audio::{AudioBackend, AudioClip, AudioFrame, VoiceClip};
use salesbuddy::playback::{AudioOutput, PlaybackEvent, PlaybackHandle, PlaybackId};
use salesbuddy::{SessionError, SessionResult};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Build a 16-bit WAV file in memory
pub fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Half a second of 16kHz mono silence
pub fn speech_clip() -> Vec<u8> {
    wav_bytes(&vec![0i16; 8000], 16000, 1)
}

pub fn frame(samples: usize, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![100; samples],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

// ----------------------------------------------------------------------------
// Backend
// ----------------------------------------------------------------------------

pub enum Reply<T> {
    Ok(T),
    Fail(u16, &'static str),
}

struct Scripted<T> {
    delay: Duration,
    reply: Reply<T>,
}

#[derive(Default)]
pub struct MockBackend {
    asks: Mutex<VecDeque<Scripted<String>>>,
    voices: Mutex<VecDeque<Scripted<VoiceAnswer>>>,
    speech: Mutex<Option<Vec<u8>>>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            speech: Mutex::new(Some(speech_clip())),
            ..Default::default()
        })
    }

    pub fn script_ask(&self, delay_ms: u64, reply: Reply<String>) {
        self.asks.lock().unwrap().push_back(Scripted {
            delay: Duration::from_millis(delay_ms),
            reply,
        });
    }

    pub fn script_voice(&self, delay_ms: u64, reply: Reply<VoiceAnswer>) {
        self.voices.lock().unwrap().push_back(Scripted {
            delay: Duration::from_millis(delay_ms),
            reply,
        });
    }

    /// Make `/tts` and audio fetches return these bytes (None = 500)
    pub fn set_speech(&self, bytes: Option<Vec<u8>>) {
        *self.speech.lock().unwrap() = bytes;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn play_script<T>(scripted: Option<Scripted<T>>) -> SessionResult<T> {
        let Some(scripted) = scripted else {
            return Err(SessionError::Backend {
                status: 500,
                message: "nothing scripted".to_string(),
            });
        };

        tokio::time::sleep(scripted.delay).await;
        match scripted.reply {
            Reply::Ok(value) => Ok(value),
            Reply::Fail(status, message) => Err(SessionError::Backend {
                status,
                message: message.to_string(),
            }),
        }
    }

    fn speech_result(&self) -> SessionResult<AudioClip> {
        match self.speech.lock().unwrap().clone() {
            Some(bytes) => Ok(AudioClip::new(bytes, Some("audio/wav".to_string()))),
            None => Err(SessionError::Backend {
                status: 500,
                message: "tts unavailable".to_string(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl AssistantBackend for MockBackend {
    async fn ask(&self, session_id: &str, text: &str) -> SessionResult<String> {
        self.record(format!("ask[{}]:{}", session_id, text));
        let scripted = self.asks.lock().unwrap().pop_front();
        Self::play_script(scripted).await
    }

    async fn ask_voice(&self, session_id: &str, clip: &VoiceClip) -> SessionResult<VoiceAnswer> {
        self.record(format!("ask_voice[{}]:{} samples", session_id, clip.sample_count));
        let scripted = self.voices.lock().unwrap().pop_front();
        Self::play_script(scripted).await
    }

    async fn synthesize(&self, text: &str) -> SessionResult<AudioClip> {
        self.record(format!("tts:{}", text));
        self.speech_result()
    }

    async fn fetch_audio(&self, audio_url: &str) -> SessionResult<AudioClip> {
        self.record(format!("fetch:{}", audio_url));
        self.speech_result()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ----------------------------------------------------------------------------
// Microphone
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct MicCounter {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl MicCounter {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Live-style microphone: the frame channel stays open until `stop`
pub struct MockMicrophone {
    counter: Arc<MicCounter>,
    frames: Vec<AudioFrame>,
    deny: bool,
    tx: Option<mpsc::Sender<AudioFrame>>,
}

impl MockMicrophone {
    pub fn new(counter: Arc<MicCounter>, frames: Vec<AudioFrame>) -> Self {
        Self {
            counter,
            frames,
            deny: false,
            tx: None,
        }
    }

    pub fn denied(counter: Arc<MicCounter>) -> Self {
        Self {
            deny: true,
            ..Self::new(counter, Vec::new())
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MockMicrophone {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        if self.deny {
            return Err(SessionError::MicrophoneUnavailable("permission denied".to_string()));
        }

        self.counter.starts.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.frames.len().max(1));
        for frame in &self.frames {
            tx.try_send(frame.clone()).unwrap();
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> SessionResult<()> {
        self.counter.stops.fetch_add(1, Ordering::SeqCst);
        self.tx = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "mock-mic"
    }
}

// ----------------------------------------------------------------------------
// Playback output
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct OutputLog {
    log: Mutex<Vec<String>>,
    playing: Mutex<Vec<PlaybackId>>,
    max_playing: AtomicUsize,
    senders: Mutex<Vec<(PlaybackId, mpsc::UnboundedSender<PlaybackEvent>)>>,
}

impl OutputLog {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn max_playing(&self) -> usize {
        self.max_playing.load(Ordering::SeqCst)
    }

    /// Pretend playback `id` reached its natural end
    pub fn finish(&self, id: PlaybackId) {
        for (sid, tx) in self.senders.lock().unwrap().iter() {
            if *sid == id {
                tx.send(PlaybackEvent::Finished(id)).unwrap();
            }
        }
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn set_playing(&self, id: PlaybackId, playing: bool) {
        let mut set = self.playing.lock().unwrap();
        set.retain(|p| *p != id);
        if playing {
            set.push(id);
        }
        self.max_playing.fetch_max(set.len(), Ordering::SeqCst);
    }
}

pub struct LoggingOutput {
    log: Arc<OutputLog>,
}

impl LoggingOutput {
    pub fn new(log: Arc<OutputLog>) -> Self {
        Self { log }
    }
}

impl AudioOutput for LoggingOutput {
    fn start(
        &mut self,
        id: PlaybackId,
        clip: &AudioClip,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> SessionResult<Box<dyn PlaybackHandle>> {
        clip.duration()?;
        self.log.push(format!("start {}", id));
        self.log.set_playing(id, true);
        self.log.senders.lock().unwrap().push((id, events));
        Ok(Box::new(LoggingHandle {
            id,
            log: Arc::clone(&self.log),
        }))
    }

    fn name(&self) -> &str {
        "logging"
    }
}

struct LoggingHandle {
    id: PlaybackId,
    log: Arc<OutputLog>,
}

impl PlaybackHandle for LoggingHandle {
    fn pause(&mut self) {
        self.log.push(format!("pause {}", self.id));
        self.log.set_playing(self.id, false);
    }

    fn resume(&mut self) {
        self.log.push(format!("resume {}", self.id));
        self.log.set_playing(self.id, true);
    }

    fn stop(&mut self) {
        self.log.push(format!("stop {}", self.id));
        self.log.set_playing(self.id, false);
    }

    fn position(&self) -> Duration {
        Duration::ZERO
    }
}

impl Drop for LoggingHandle {
    fn drop(&mut self) {
        self.log.set_playing(self.id, false);
    }
}
