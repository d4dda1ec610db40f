use super::messages::VoiceAnswer;
use crate::audio::{AudioClip, VoiceClip};
use crate::error::SessionResult;

/// The remote assistant the session talks to
///
/// Implementations:
/// - `HttpBackend`: the SalesBuddy REST service
#[async_trait::async_trait]
pub trait AssistantBackend: Send + Sync {
    /// `POST /ask`: answer a typed question
    async fn ask(&self, session_id: &str, text: &str) -> SessionResult<String>;

    /// `POST /ask-voice`: transcribe and answer a recorded question
    async fn ask_voice(&self, session_id: &str, clip: &VoiceClip) -> SessionResult<VoiceAnswer>;

    /// `GET /tts`: synthesize speech for an answer
    async fn synthesize(&self, text: &str) -> SessionResult<AudioClip>;

    /// Fetch audio the backend referenced by a (server-relative) URL
    async fn fetch_audio(&self, audio_url: &str) -> SessionResult<AudioClip>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
