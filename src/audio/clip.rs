use std::io::Cursor;
use std::time::Duration;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{SessionError, SessionResult};

/// Synthesized speech as fetched from the backend
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the server, if any
    pub content_type: Option<String>,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }

    /// File extension guessed from the content type (defaults to wav)
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_deref() {
            Some(ct) if ct.contains("mpeg") || ct.contains("mp3") => "mp3",
            Some(ct) if ct.contains("ogg") => "ogg",
            Some(ct) if ct.contains("flac") => "flac",
            _ => "wav",
        }
    }

    /// Probe the container and work out how long the clip plays for
    ///
    /// Fails with `SessionError::Playback` for anything symphonia can't read.
    pub fn duration(&self) -> SessionResult<Duration> {
        if self.bytes.is_empty() {
            return Err(SessionError::Playback("empty audio clip".to_string()));
        }

        let mut hint = Hint::new();
        hint.with_extension(self.extension());
        if let Some(ct) = &self.content_type {
            hint.mime_type(ct);
        }

        let mss = MediaSourceStream::new(Box::new(Cursor::new(self.bytes.clone())), Default::default());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| SessionError::Playback(format!("unrecognized audio: {}", e)))?;

        let track = probed
            .format
            .default_track()
            .ok_or_else(|| SessionError::Playback("audio has no playable track".to_string()))?;

        let params = &track.codec_params;
        match (params.n_frames, params.sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => {
                Ok(Duration::from_millis(frames * 1000 / rate as u64))
            }
            _ => Err(SessionError::Playback(
                "audio duration is unknown".to_string(),
            )),
        }
    }
}
