use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use std::fmt::Display;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::error::{SessionError, SessionResult};

/// Frames buffered between the device callback and the recorder
const FRAME_QUEUE: usize = 512;

/// Live microphone via cpal
///
/// cpal streams are not `Send` on every platform, so the stream lives on a
/// dedicated thread from `start` until `stop`. Frames are delivered in the
/// device's native rate and layout; `VoiceRecorder` normalizes them.
pub struct CpalMicrophone {
    device_name: Option<String>,
    config: AudioBackendConfig,
    capture: Option<Capture>,
}

struct Capture {
    stop_tx: std_mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

impl CpalMicrophone {
    /// `device_name` of `None` picks the host's default input device
    pub fn new(device_name: Option<String>, config: AudioBackendConfig) -> Self {
        Self {
            device_name,
            config,
            capture: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for CpalMicrophone {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<AudioFrame>> {
        if self.capture.is_some() {
            return Err(SessionError::AlreadyRecording);
        }

        let (frames_tx, frames_rx) = mpsc::channel(FRAME_QUEUE);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let device_name = self.device_name.clone();

        let thread = std::thread::Builder::new()
            .name("salesbuddy-mic".to_string())
            .spawn(move || run_capture(device_name, frames_tx, ready_tx, stop_rx))
            .map_err(unavailable)?;

        let opened = ready_rx
            .await
            .map_err(|_| SessionError::MicrophoneUnavailable("capture thread exited".to_string()))?;

        let description = match opened {
            Ok(description) => description,
            Err(e) => {
                let _ = thread.join();
                return Err(e);
            }
        };

        info!(
            "Microphone started: {} (recording at {}Hz/{}ch)",
            description, self.config.target_sample_rate, self.config.target_channels
        );
        self.capture = Some(Capture { stop_tx, thread });

        Ok(frames_rx)
    }

    async fn stop(&mut self) -> SessionResult<()> {
        let Some(capture) = self.capture.take() else {
            return Ok(());
        };

        let _ = capture.stop_tx.send(());

        // Joining drops the stream, and with it the frame sender
        tokio::task::spawn_blocking(move || capture.thread.join())
            .await
            .map_err(|e| SessionError::Audio(e.to_string()))?
            .map_err(|_| SessionError::Audio("microphone thread panicked".to_string()))?;

        info!("Microphone released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

fn unavailable(e: impl Display) -> SessionError {
    SessionError::MicrophoneUnavailable(e.to_string())
}

fn run_capture(
    device_name: Option<String>,
    frames_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<SessionResult<String>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let stream = match open_stream(device_name.as_deref(), frames_tx) {
        Ok((stream, description)) => {
            let _ = ready_tx.send(Ok(description));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Until stop() or the microphone is dropped
    let _ = stop_rx.recv();
    drop(stream);
}

fn open_stream(
    device_name: Option<&str>,
    frames_tx: mpsc::Sender<AudioFrame>,
) -> SessionResult<(cpal::Stream, String)> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(wanted) => host
            .input_devices()
            .map_err(unavailable)?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| unavailable(format!("no input device named {:?}", wanted)))?,
        None => host
            .default_input_device()
            .ok_or_else(|| unavailable("no default input device"))?,
    };

    let supported = device.default_input_config().map_err(unavailable)?;
    let sample_format = supported.sample_format();
    let config = supported.config();

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, frames_tx),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, frames_tx),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, frames_tx),
        other => return Err(unavailable(format!("unsupported sample format {:?}", other))),
    }
    .map_err(unavailable)?;

    stream.play().map_err(unavailable)?;

    let description = format!(
        "{} ({}Hz, {}ch, {:?})",
        device.name().unwrap_or_else(|_| "unknown device".to_string()),
        config.sample_rate.0,
        config.channels,
        sample_format
    );
    Ok((stream, description))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    frames_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let mut captured: u64 = 0;

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let frame = to_frame(data, sample_rate, channels, captured);
            captured += (data.len() / channels.max(1) as usize) as u64;

            if let Err(TrySendError::Full(frame)) = frames_tx.try_send(frame) {
                warn!("Recorder lagging, dropped {}ms of audio", frame.duration_ms());
            }
        },
        |err| error!("Microphone stream error: {}", err),
        None,
    )
}

/// `captured` is the number of per-channel samples before this callback
fn to_frame<T>(data: &[T], sample_rate: u32, channels: u16, captured: u64) -> AudioFrame
where
    T: Sample,
    i16: FromSample<T>,
{
    AudioFrame {
        samples: data.iter().map(|&s| s.to_sample::<i16>()).collect(),
        sample_rate,
        channels,
        timestamp_ms: captured * 1000 / sample_rate.max(1) as u64,
    }
}
