use std::path::PathBuf;

use crate::audio::AudioBackendConfig;
use crate::config::{Config, FeaturesConfig};

/// Configuration for a conversation session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sent with every backend request (e.g., "demo-session")
    pub session_id: String,

    /// Capture format for voice questions
    pub audio: AudioBackendConfig,

    /// Voice/export switches
    pub features: FeaturesConfig,

    /// Where transcripts go when no explicit path is given
    pub export_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: "demo-session".to_string(),
            audio: AudioBackendConfig::default(),
            features: FeaturesConfig::default(),
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl SessionConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            session_id: cfg.backend.session_id.clone(),
            audio: AudioBackendConfig::from(&cfg.audio),
            features: cfg.features.clone(),
            export_dir: cfg.export_dir(),
        }
    }

    /// Replace the fixed demo id with a fresh one
    pub fn with_fresh_session_id(mut self) -> Self {
        self.session_id = format!("session-{}", uuid::Uuid::new_v4());
        self
    }
}
