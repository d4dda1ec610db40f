//! Conversation session management
//!
//! This module provides the `SessionController` that manages:
//! - The conversation log and draft
//! - Text and voice questions against the backend
//! - Request sequencing (only the newest answer is applied)
//! - Playback of the spoken answer
//! - Session statistics and transcript export

mod config;
mod controller;
mod events;
mod sequence;
mod state;
mod stats;

pub use config::SessionConfig;
pub use controller::{SessionController, TurnOutcome};
pub use events::SessionEvent;
pub use sequence::{RequestId, RequestTracker};
pub use state::{ConversationState, Message, Role};
pub use stats::SessionStats;
