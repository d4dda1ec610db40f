use tokio::sync::mpsc;

use crate::config::AudioConfig;
use crate::error::SessionResult;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    pub fn duration_ms(&self) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / per_second
    }
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (recordings are downsampled to this)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (frame length)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for speech recognition
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms buffers
        }
    }
}

impl From<&AudioConfig> for AudioBackendConfig {
    fn from(cfg: &AudioConfig) -> Self {
        Self {
            target_sample_rate: cfg.sample_rate,
            target_channels: cfg.channels,
            buffer_duration_ms: cfg.buffer_duration_ms,
        }
    }
}

/// Microphone capture backend
///
/// The session controller owns exactly one backend and holds it open from
/// `start` to `stop`. Implementations:
/// - `FileMicrophone`: replays a WAV file (CLI voice turns, tests)
/// - `CpalMicrophone`: live input device (`devices` feature)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Acquire the device and start capturing
    ///
    /// Returns a channel receiver that will receive audio frames. Fails with
    /// `SessionError::MicrophoneUnavailable` when the device cannot be opened.
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>>;

    /// Release the device and close the frame channel
    ///
    /// Frames already captured stay readable on the receiver.
    async fn stop(&mut self) -> SessionResult<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
