//! JSON transcript export

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{SessionError, SessionResult};
use crate::session::{ConversationState, Message};

/// Snapshot of a conversation as written to disk
#[derive(Debug, Serialize)]
pub struct TranscriptExport<'a> {
    pub session_id: &'a str,
    pub exported_at: DateTime<Utc>,
    pub messages: &'a [Message],
}

impl<'a> TranscriptExport<'a> {
    pub fn new(session_id: &'a str, state: &'a ConversationState) -> Self {
        Self {
            session_id,
            exported_at: Utc::now(),
            messages: state.messages(),
        }
    }

    pub fn to_json(&self) -> SessionResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SessionError::Export(e.to_string()))
    }

    /// Default file name: `transcript-<session>-<timestamp>.json`
    ///
    /// The session id comes from config or the environment, so anything other
    /// than ASCII letters, digits, `-` and `_` is replaced with `_`.
    pub fn file_name(&self) -> String {
        format!(
            "transcript-{}-{}.json",
            file_safe(self.session_id),
            self.exported_at.format("%Y%m%d-%H%M%S")
        )
    }

    /// Write to `path`, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> SessionResult<PathBuf> {
        let json = self.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::Export(format!("{}: {}", parent.display(), e)))?;
        }

        std::fs::write(path, json)
            .map_err(|e| SessionError::Export(format!("{}: {}", path.display(), e)))?;

        info!(
            "Exported {} messages to {}",
            self.messages.len(),
            path.display()
        );

        Ok(path.to_path_buf())
    }
}

fn file_safe(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "session".to_string()
    } else {
        cleaned
    }
}
