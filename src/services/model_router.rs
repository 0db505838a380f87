//! Prompt-aware model routing.
//!
//! Routine calls go to the cheap chat model; prompts that smell like
//! heavy analytical work are routed to the reasoner model by a keyword
//! scan of the concatenated message text.

use crate::domain::models::ChatMessage;

/// Phrases that indicate a prompt is worth the pricier model.
const REASONER_HINTS: &[&str] = &[
    "backtest",
    "optimize",
    "optimization",
    "portfolio",
    "sharpe",
    "drawdown",
    "walk-forward",
    "monte carlo",
    "statistical significance",
    "hyperparameter",
];

/// Result of a routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: String,
    pub upgraded: bool,
}

#[derive(Debug, Clone)]
pub struct ModelRouter {
    chat_model: String,
    reasoner_model: String,
    auto_upgrade: bool,
}

impl ModelRouter {
    pub fn new(chat_model: &str, reasoner_model: &str, auto_upgrade: bool) -> Self {
        Self {
            chat_model: chat_model.to_string(),
            reasoner_model: reasoner_model.to_string(),
            auto_upgrade,
        }
    }

    /// Pick a model for this conversation.
    pub fn select(&self, messages: &[ChatMessage]) -> ModelSelection {
        if self.auto_upgrade && Self::wants_reasoner(messages) {
            ModelSelection {
                model: self.reasoner_model.clone(),
                upgraded: true,
            }
        } else {
            ModelSelection {
                model: self.chat_model.clone(),
                upgraded: false,
            }
        }
    }

    fn wants_reasoner(messages: &[ChatMessage]) -> bool {
        let text: String = messages
            .iter()
            .map(|m| m.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        REASONER_HINTS.iter().any(|hint| text.contains(hint))
    }
}
