pub mod backend;
pub mod client;
pub mod messages;

pub use backend::AssistantBackend;
pub use client::HttpBackend;
pub use messages::{AskResponse, ErrorResponse, VoiceAnswer};
