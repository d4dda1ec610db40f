use reqwest::{multipart, Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::backend::AssistantBackend;
use super::messages::{AskResponse, ErrorResponse, VoiceAnswer};
use crate::audio::{AudioClip, VoiceClip};
use crate::config::BackendConfig;
use crate::error::{SessionError, SessionResult};

/// Client for the SalesBuddy REST backend
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> SessionResult<Self> {
        // Url::join drops the last path segment unless it ends with '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| SessionError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let client = Client::builder().timeout(config.timeout()).build()?;

        info!("Backend client ready: {}", base_url);

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> SessionResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| SessionError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Resolve an `audio_url` from the backend, absolute or server-relative
    fn resolve(&self, audio_url: &str) -> SessionResult<Url> {
        self.base_url
            .join(audio_url)
            .map_err(|e| SessionError::InvalidUrl(format!("{}: {}", audio_url, e)))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> SessionResult<T> {
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SessionError::MalformedResponse(e.to_string()))
    }

    async fn read_audio(response: Response) -> SessionResult<AudioClip> {
        let response = check_status(response).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        if bytes.is_empty() {
            return Err(SessionError::MalformedResponse("empty audio body".to_string()));
        }

        Ok(AudioClip::new(bytes.to_vec(), content_type))
    }
}

/// Map non-2xx responses to `SessionError::Backend`
async fn check_status(response: Response) -> SessionResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);

    Err(SessionError::Backend {
        status: status.as_u16(),
        message,
    })
}

#[async_trait::async_trait]
impl AssistantBackend for HttpBackend {
    async fn ask(&self, session_id: &str, text: &str) -> SessionResult<String> {
        let form = multipart::Form::new()
            .text("session_id", session_id.to_string())
            .text("text", text.to_string());

        debug!("POST /ask ({} chars)", text.len());

        let response = self
            .client
            .post(self.endpoint("ask")?)
            .multipart(form)
            .send()
            .await?;

        let answer: AskResponse = Self::read_json(response).await?;
        Ok(answer.text)
    }

    async fn ask_voice(&self, session_id: &str, clip: &VoiceClip) -> SessionResult<VoiceAnswer> {
        let part = multipart::Part::bytes(clip.wav.clone())
            .file_name("recording.wav")
            .mime_str("audio/wav")?;

        let form = multipart::Form::new()
            .text("session_id", session_id.to_string())
            .part("audio", part);

        debug!("POST /ask-voice ({} bytes)", clip.wav.len());

        let response = self
            .client
            .post(self.endpoint("ask-voice")?)
            .multipart(form)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn synthesize(&self, text: &str) -> SessionResult<AudioClip> {
        debug!("GET /tts ({} chars)", text.len());

        let response = self
            .client
            .get(self.endpoint("tts")?)
            .query(&[("text", text)])
            .send()
            .await?;

        Self::read_audio(response).await
    }

    async fn fetch_audio(&self, audio_url: &str) -> SessionResult<AudioClip> {
        let url = self.resolve(audio_url)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        Self::read_audio(response).await
    }

    fn name(&self) -> &str {
        "http"
    }
}
