use hound::WavReader;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::error::{SessionError, SessionResult};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(SessionError::Audio(format!(
                "{} is not 16-bit PCM ({} bits, {:?})",
                path.display(),
                spec.bits_per_sample,
                spec.sample_format
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split the file into consecutive frames of `frame_ms` each
    pub fn frames(&self, frame_ms: u64) -> Vec<AudioFrame> {
        let samples_per_frame = (self.sample_rate as u64 * frame_ms / 1000) as usize
            * self.channels.max(1) as usize;
        let samples_per_frame = samples_per_frame.max(self.channels.max(1) as usize);

        self.samples
            .chunks(samples_per_frame)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: i as u64 * frame_ms,
            })
            .collect()
    }
}

/// Microphone backed by a WAV file
///
/// `start` reads the whole file and queues every frame before returning, so a
/// `stop` issued right after never loses audio.
pub struct FileMicrophone {
    path: PathBuf,
    config: AudioBackendConfig,
    capturing: bool,
}

impl FileMicrophone {
    pub fn new(path: impl Into<PathBuf>, config: AudioBackendConfig) -> Self {
        Self {
            path: path.into(),
            config,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileMicrophone {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| SessionError::MicrophoneUnavailable(e.to_string()))?
            .map_err(|e| SessionError::MicrophoneUnavailable(e.to_string()))?;

        let frames = audio.frames(self.config.buffer_duration_ms.max(1));
        let (tx, rx) = mpsc::channel(frames.len().max(1));

        for frame in frames {
            if tx.try_send(frame).is_err() {
                warn!("Dropped frame while queueing {}", self.path.display());
            }
        }

        self.capturing = true;
        info!("File microphone started: {}", self.path.display());

        Ok(rx)
    }

    async fn stop(&mut self) -> SessionResult<()> {
        self.capturing = false;
        info!("File microphone released: {}", self.path.display());
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "file"
    }
}
