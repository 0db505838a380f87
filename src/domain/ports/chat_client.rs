//! Chat-completion port.
//!
//! Transport and provider failures surface as typed errors rather than
//! error strings disguised as assistant output, so callers can always
//! tell "the model said X" apart from "the call failed".

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{ChatMessage, ChatReply, ChatStats};

/// Errors surfaced by a chat backend.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("API key not configured (set DEEPSEEK_API_KEY)")]
    MissingApiKey,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ChatError {
    /// Provider rate-limit responses warrant a single retry.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Transport(msg) => msg.contains("429") || msg.contains("rate_limit"),
            _ => false,
        }
    }
}

/// Abstraction over a chat-completion backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a conversation and return the assistant's reply.
    async fn chat(&self, messages: &[ChatMessage], temperature: f32)
    -> Result<ChatReply, ChatError>;

    /// Running usage counters for this client.
    fn stats(&self) -> ChatStats;
}
