pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod playback;
pub mod session;

pub use api::{AssistantBackend, HttpBackend, VoiceAnswer};
pub use audio::{
    AudioBackend, AudioBackendConfig, AudioClip, AudioFile, AudioFrame, FileMicrophone, VoiceClip,
    VoiceRecorder,
};
pub use config::Config;
pub use error::{SessionError, SessionResult};
pub use export::TranscriptExport;
pub use playback::{AudioOutput, PlaybackController, PlaybackEvent, PlaybackHandle, TimedOutput};
pub use session::{
    ConversationState, Message, RequestId, Role, SessionConfig, SessionController, SessionEvent,
    SessionStats, TurnOutcome,
};

#[cfg(feature = "devices")]
pub use audio::CpalMicrophone;
#[cfg(feature = "devices")]
pub use playback::SpeakerOutput;
