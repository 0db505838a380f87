//! Best-effort Telegram notifications.
//!
//! Disabled silently when no token or chat id is configured; never
//! propagates a send failure to the caller.

use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use crate::domain::models::TelegramConfig;
use crate::infrastructure::env_or_dotenv;

const MESSAGE_CAP: usize = 4000;

pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    chat_id: String,
    enabled: bool,
}

impl TelegramNotifier {
    /// Resolve credentials from config, falling back to the
    /// `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` environment (or `.env`).
    pub fn new(config: &TelegramConfig) -> Self {
        let token = config
            .bot_token
            .clone()
            .or_else(|| env_or_dotenv("TELEGRAM_BOT_TOKEN"));
        let chat_id = config
            .chat_id
            .clone()
            .or_else(|| env_or_dotenv("TELEGRAM_CHAT_ID"));

        let enabled = token.is_some() && chat_id.is_some();
        if enabled {
            info!("telegram notifications enabled");
        } else {
            info!("telegram notifications disabled (no token/chat_id configured)");
        }

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: token
                .map(|t| format!("https://api.telegram.org/bot{t}"))
                .unwrap_or_default(),
            chat_id: chat_id.unwrap_or_default(),
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            base_url: String::new(),
            chat_id: String::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Send a message, truncated to the Telegram limit. Returns whether
    /// the send went through.
    pub async fn send_message(&self, text: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let text = if text.chars().count() > MESSAGE_CAP {
            let truncated: String = text.chars().take(MESSAGE_CAP).collect();
            format!("{truncated}\n...")
        } else {
            text.to_string()
        };

        let result = self
            .client
            .get(format!("{}/sendMessage", self.base_url))
            .query(&[("chat_id", self.chat_id.as_str()), ("text", text.as_str())])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "telegram send failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "telegram error");
                false
            }
        }
    }

    pub async fn send_cycle_start(&self, cycle: u32) {
        self.send_message(&format!("Autonomous Cycle #{cycle} started!"))
            .await;
    }

    pub async fn send_task_complete(&self, task_title: &str, agent: &str, rounds: u32) {
        self.send_message(&format!(
            "Done: {task_title}\nAgent: {agent}\nRounds: {rounds}"
        ))
        .await;
    }

    pub async fn send_pipeline_done(&self, total_tasks: usize, cycle: u32) {
        self.send_message(&format!(
            "Pipeline Complete!\n{total_tasks} tasks done\nCycle #{cycle}"
        ))
        .await;
    }

    pub async fn send_auto_plan(&self, new_tasks: &[String]) {
        let task_list = new_tasks
            .iter()
            .take(5)
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n");
        self.send_message(&format!("PM Auto-Plan:\n{task_list}")).await;
    }

    pub async fn send_cost_report(&self, cost_summary: &str) {
        self.send_message(&format!("Cost Report:\n{cost_summary}"))
            .await;
    }

    pub async fn send_error(&self, error_msg: &str) {
        let snippet: String = error_msg.chars().take(500).collect();
        self.send_message(&format!("ERROR:\n{snippet}")).await;
    }

    pub async fn send_vote_result(&self, proposal: &str, result: &str) {
        self.send_message(&format!("Vote Result:\n{proposal}\n{result}"))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_notifier_never_sends() {
        let notifier = TelegramNotifier::disabled();
        assert!(!notifier.is_enabled());
        assert!(!notifier.send_message("hello").await);
    }

    #[test]
    fn test_unconfigured_is_disabled() {
        let notifier = TelegramNotifier::new(&TelegramConfig::default());
        // May pick up ambient env in a developer shell; the default CI
        // environment has neither variable.
        if env_or_dotenv("TELEGRAM_BOT_TOKEN").is_none() {
            assert!(!notifier.is_enabled());
        }
    }
}
