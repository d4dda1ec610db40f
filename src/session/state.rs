use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One entry of the conversation log; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Conversation log, draft and transient UI flags
///
/// Only the session controller mutates this; everyone else gets `&self`.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    draft: String,
    is_recording: bool,
    is_agent_speaking: bool,
    is_typing: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn is_agent_speaking(&self) -> bool {
        self.is_agent_speaking
    }

    /// An answer is pending
    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn set_draft(&mut self, draft: String) {
        self.draft = draft;
    }

    /// Take the trimmed draft, leaving it in place when there is nothing to send
    pub(crate) fn take_draft(&mut self) -> Option<String> {
        let trimmed = self.draft.trim();
        if trimmed.is_empty() {
            return None;
        }
        let text = trimmed.to_string();
        self.draft.clear();
        Some(text)
    }

    pub(crate) fn set_recording(&mut self, value: bool) {
        self.is_recording = value;
    }

    pub(crate) fn set_agent_speaking(&mut self, value: bool) {
        self.is_agent_speaking = value;
    }

    pub(crate) fn set_typing(&mut self, value: bool) {
        self.is_typing = value;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
