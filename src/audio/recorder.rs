use std::io::Cursor;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::{AudioBackendConfig, AudioFrame};
use crate::error::{SessionError, SessionResult};

/// A finished voice recording, encoded as a single WAV blob
#[derive(Debug, Clone)]
pub struct VoiceClip {
    /// Complete WAV file bytes
    pub wav: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
    pub duration_ms: u64,
}

/// Buffers captured frames for one recording and encodes them on finish
///
/// Frames are normalized to the configured target format as they arrive.
pub struct VoiceRecorder {
    config: AudioBackendConfig,
    samples: Vec<i16>,
    frames_seen: usize,
    resampler: Option<Resampler>,
}

impl VoiceRecorder {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            samples: Vec::new(),
            frames_seen: 0,
            resampler: None,
        }
    }

    /// Drain a capture channel until the microphone side closes it
    pub async fn record(mut self, mut audio_rx: mpsc::Receiver<AudioFrame>) -> SessionResult<VoiceClip> {
        debug!("Voice recorder listening");

        while let Some(frame) = audio_rx.recv().await {
            self.push(frame);
        }

        self.finish()
    }

    pub fn push(&mut self, frame: AudioFrame) {
        let target_channels = self.config.target_channels;

        let Some(samples) = remix(&frame.samples, frame.channels, target_channels) else {
            warn!(
                "Dropping {}ms frame at {}ms: {} channels cannot be mixed to {}",
                frame.duration_ms(),
                frame.timestamp_ms,
                frame.channels,
                target_channels
            );
            return;
        };

        let target_rate = self.config.target_sample_rate;
        let current_rate = self.resampler.as_ref().map(|r| r.src_rate);
        if current_rate.is_some_and(|rate| rate != frame.sample_rate.max(1)) {
            warn!("Capture rate changed to {}Hz mid-recording", frame.sample_rate);
            self.resampler = None;
        }
        let resampler = self
            .resampler
            .get_or_insert_with(|| Resampler::new(frame.sample_rate, target_rate));

        let resampled = resampler.process(&samples, target_channels.max(1) as usize);

        self.frames_seen += 1;
        self.samples.extend_from_slice(&resampled);
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Encode the buffered samples as one WAV blob
    pub fn finish(self) -> SessionResult<VoiceClip> {
        if self.samples.is_empty() {
            return Err(SessionError::EmptyRecording);
        }

        let spec = hound::WavSpec {
            channels: self.config.target_channels,
            sample_rate: self.config.target_sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        let per_second = spec.sample_rate as u64 * spec.channels as u64;
        let duration_ms = self.samples.len() as u64 * 1000 / per_second.max(1);

        info!(
            "Recording finalized: {} frames, {} samples, {:.1}s",
            self.frames_seen,
            self.samples.len(),
            duration_ms as f64 / 1000.0
        );

        Ok(VoiceClip {
            wav: cursor.into_inner(),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            sample_count: self.samples.len(),
            duration_ms,
        })
    }
}

/// Nearest-sample rate converter that keeps its position across frames
///
/// Output frame `n` takes input frame `n * src / dst`, counted over the whole
/// recording, so arbitrary callback sizes and non-integer ratios
/// (44.1kHz -> 16kHz) neither drift nor lose samples at frame boundaries.
#[derive(Debug)]
struct Resampler {
    src_rate: u32,
    dst_rate: u32,
    /// Input frames seen so far
    consumed: u64,
    /// Output frames emitted so far
    produced: u64,
}

impl Resampler {
    fn new(src_rate: u32, dst_rate: u32) -> Self {
        Self {
            src_rate: src_rate.max(1),
            dst_rate: dst_rate.max(1),
            consumed: 0,
            produced: 0,
        }
    }

    /// `input` is interleaved with `channels` samples per frame
    fn process(&mut self, input: &[i16], channels: usize) -> Vec<i16> {
        if self.src_rate == self.dst_rate {
            return input.to_vec();
        }

        let frames = (input.len() / channels) as u64;
        let end = self.consumed + frames;
        let expected = frames * self.dst_rate as u64 / self.src_rate as u64 + 1;
        let mut out = Vec::with_capacity(expected as usize * channels);

        loop {
            let src_index = self.produced * self.src_rate as u64 / self.dst_rate as u64;
            if src_index >= end {
                break;
            }
            let offset = (src_index - self.consumed) as usize * channels;
            out.extend_from_slice(&input[offset..offset + channels]);
            self.produced += 1;
        }

        self.consumed = end;
        out
    }
}

/// Convert interleaved samples between channel layouts
///
/// Any layout folds down to mono by averaging, mono spreads to any layout.
/// Returns `None` for other combinations.
fn remix(samples: &[i16], from: u16, to: u16) -> Option<Vec<i16>> {
    let from = from.max(1) as usize;
    let to = to.max(1) as usize;

    if from == to {
        return Some(samples.to_vec());
    }

    if to == 1 {
        let mono = samples
            .chunks_exact(from)
            .map(|group| (group.iter().map(|&s| s as i32).sum::<i32>() / from as i32) as i16)
            .collect();
        return Some(mono);
    }

    if from == 1 {
        return Some(samples.iter().flat_map(|&s| std::iter::repeat(s).take(to)).collect());
    }

    None
}
