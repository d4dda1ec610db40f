use thiserror::Error;

/// Errors surfaced by the session controller and its collaborators.
///
/// None of these are fatal to a session: the controller logs them, resets the
/// transient flag they affect and the user may simply retry.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport failure talking to the backend
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// Backend URL (configured or returned by the server) did not parse
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Backend answered 2xx but the body did not decode
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// Microphone could not be acquired (permission denied, no device, ...)
    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// Draft was empty or whitespace only
    #[error("nothing to send")]
    EmptyInput,

    /// A newer request replaced this one before it was answered
    #[error("request {0} was superseded by a newer one")]
    Superseded(String),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("recording captured no audio")]
    EmptyRecording,

    /// Audio clip could not be played
    #[error("playback failed: {0}")]
    Playback(String),

    #[error("{0} is disabled in this configuration")]
    FeatureDisabled(&'static str),

    #[error("export failed: {0}")]
    Export(String),

    /// Encoding or decoding of recorded audio failed
    #[error("audio error: {0}")]
    Audio(String),
}

impl From<hound::Error> for SessionError {
    fn from(e: hound::Error) -> Self {
        SessionError::Audio(e.to_string())
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
