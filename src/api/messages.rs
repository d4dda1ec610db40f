use serde::{Deserialize, Serialize};

/// Reply to `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub text: String,
}

/// Reply to `POST /ask-voice`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceAnswer {
    /// What the backend heard
    pub user_text: String,
    pub resp_text: String,
    /// Server-relative path of the spoken answer
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Error body returned by the backend on 4xx/5xx
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
