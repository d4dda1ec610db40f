use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Messages in the log
    pub message_count: usize,

    /// Turns that produced an answer
    pub turns_completed: usize,

    /// Turns that failed at the backend
    pub failed_requests: usize,

    /// Responses dropped because a newer request had been issued
    pub stale_responses: usize,

    pub is_recording: bool,
    pub is_agent_speaking: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Counters {
    pub turns_completed: usize,
    pub failed_requests: usize,
    pub stale_responses: usize,
}
