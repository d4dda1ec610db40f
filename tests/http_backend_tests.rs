// Integration tests for the HTTP backend client against a local fake server

mod common;

use axum::extract::{Multipart, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{speech_clip, wav_bytes};
use salesbuddy::config::BackendConfig;
use salesbuddy::{AssistantBackend, HttpBackend, SessionError, VoiceClip};
use serde_json::json;
use std::collections::HashMap;

/// Every text field plus, for file parts, `<name>.file` / `<name>.type` / `<name>.len`
async fn read_form(mut multipart: Multipart) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name() {
            fields.insert(format!("{}.file", name), file_name.to_string());
            fields.insert(
                format!("{}.type", name),
                field.content_type().unwrap_or_default().to_string(),
            );
            let bytes = field.bytes().await.unwrap();
            fields.insert(format!("{}.len", name), bytes.len().to_string());
        } else {
            fields.insert(name, field.text().await.unwrap());
        }
    }
    fields
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn wav_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response()
}

async fn ask(multipart: Multipart) -> Response {
    let form = read_form(multipart).await;
    let session_id = form.get("session_id").cloned().unwrap_or_default();
    let text = form.get("text").cloned().unwrap_or_default();

    match text.as_str() {
        "" => error(StatusCode::BAD_REQUEST, "no input"),
        "garbage" => "this is not json".into_response(),
        "crash" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        _ => Json(json!({ "text": format!("[{}] {}", session_id, text) })).into_response(),
    }
}

async fn ask_voice(multipart: Multipart) -> Response {
    let form = read_form(multipart).await;

    if form.get("audio.file").map(String::as_str) != Some("recording.wav")
        || form.get("audio.type").map(String::as_str) != Some("audio/wav")
    {
        return error(StatusCode::BAD_REQUEST, "audio part missing");
    }

    Json(json!({
        "user_text": format!("{} bytes from {}", form["audio.len"], form["session_id"]),
        "resp_text": "Venue gives around 18 km per litre.",
        "audio_url": "/audio/reply-1.wav",
    }))
    .into_response()
}

async fn tts(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("text").map(String::as_str) {
        Some("Venue & Nexon?") => wav_response(speech_clip()),
        _ => error(StatusCode::BAD_REQUEST, "unexpected text"),
    }
}

fn app() -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/ask-voice", post(ask_voice))
        .route("/tts", get(tts))
        .route("/audio/reply-1.wav", get(|| async { wav_response(speech_clip()) }))
        .route("/audio/empty.wav", get(|| async { wav_response(Vec::new()) }))
}

async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app()).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str) -> HttpBackend {
    HttpBackend::new(&BackendConfig {
        base_url: base_url.to_string(),
        session_id: "demo-session".to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_ask_sends_session_and_text() {
    let backend = client(&spawn_server().await);

    let answer = backend
        .ask("demo-session", "compare Venue and Nexon")
        .await
        .unwrap();

    assert_eq!(answer, "[demo-session] compare Venue and Nexon");
}

#[tokio::test]
async fn test_error_body_is_mapped_to_backend_error() {
    let backend = client(&spawn_server().await);

    match backend.ask("demo-session", "").await {
        Err(SessionError::Backend { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "no input");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_plain_error_body_is_kept_verbatim() {
    let backend = client(&spawn_server().await);

    match backend.ask("demo-session", "crash").await {
        Err(SessionError::Backend { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_success_is_malformed() {
    let backend = client(&spawn_server().await);

    let result = backend.ask("demo-session", "garbage").await;

    assert!(matches!(result, Err(SessionError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_ask_voice_uploads_wav_part() {
    let backend = client(&spawn_server().await);
    let wav = wav_bytes(&[0i16; 1600], 16000, 1);
    let clip = VoiceClip {
        wav: wav.clone(),
        sample_rate: 16000,
        channels: 1,
        sample_count: 1600,
        duration_ms: 100,
    };

    let answer = backend.ask_voice("demo-session", &clip).await.unwrap();

    assert_eq!(answer.user_text, format!("{} bytes from demo-session", wav.len()));
    assert_eq!(answer.resp_text, "Venue gives around 18 km per litre.");
    assert_eq!(answer.audio_url.as_deref(), Some("/audio/reply-1.wav"));
}

#[tokio::test]
async fn test_tts_encodes_query_and_returns_audio() {
    let backend = client(&spawn_server().await);

    let clip = backend.synthesize("Venue & Nexon?").await.unwrap();

    assert_eq!(clip.content_type.as_deref(), Some("audio/wav"));
    assert_eq!(clip.bytes, speech_clip());
    assert_eq!(clip.duration().unwrap().as_millis(), 500);
}

#[tokio::test]
async fn test_relative_audio_url_is_fetched_from_server_root() {
    let base = spawn_server().await;
    // Base path is ignored for server-relative audio urls
    let backend = client(&format!("{}/api", base));

    let clip = backend.fetch_audio("/audio/reply-1.wav").await.unwrap();

    assert_eq!(clip.bytes, speech_clip());
}

#[tokio::test]
async fn test_empty_audio_body_is_malformed() {
    let backend = client(&spawn_server().await);

    let result = backend.fetch_audio("/audio/empty.wav").await;

    assert!(matches!(result, Err(SessionError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = client(&format!("http://{}", addr));
    let result = backend.ask("demo-session", "hello").await;

    assert!(matches!(result, Err(SessionError::Network(_))));
}
