//! Chat message types for the LLM client boundary.

use serde::{Deserialize, Serialize};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single role-tagged message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Token usage reported by the provider for one call.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// A successful assistant reply.
///
/// Failures never arrive here; they are a typed [`ChatError`] so callers
/// can distinguish "the model said X" from "the call failed".
///
/// [`ChatError`]: crate::domain::ports::ChatError
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub content: String,
    pub model: String,
    pub usage: ChatUsage,
}

/// Running counters kept by a chat client.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatStats {
    pub calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
    /// Number of acquisitions that had to wait on the rate limiter.
    pub rate_limit_waits: u64,
}

impl ChatStats {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// One-line cost summary for reports.
    pub fn summary(&self) -> String {
        format!(
            "{} calls | {} tokens | ${:.4}",
            self.calls,
            self.total_tokens(),
            self.cost_usd
        )
    }
}
