//! DeepSeek chat-completions client.
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol, tracks
//! usage and cost counters, routes analytical prompts to the reasoner
//! model, and throttles itself through a sliding-window rate limiter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::models::{ChatMessage, ChatReply, ChatStats, ChatUsage, LlmConfig};
use crate::domain::ports::{ChatClient, ChatError};
use crate::services::model_router::ModelRouter;

use super::rate_limiter::SlidingWindowLimiter;

/// Pricing per million tokens (USD).
#[derive(Debug, Clone, Copy)]
struct ModelPricing {
    input: f64,
    output: f64,
}

const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    ("deepseek-chat", ModelPricing { input: 0.27, output: 1.10 }),
    ("deepseek-reasoner", ModelPricing { input: 0.55, output: 2.19 }),
];

fn pricing_for(model: &str) -> Option<ModelPricing> {
    let model = model.to_lowercase();
    PRICING_TABLE
        .iter()
        .find(|(name, _)| model.contains(name))
        .map(|(_, p)| *p)
}

/// Rough token estimate used for rate-limiter reservations before the
/// provider reports actual usage. Four characters per token.
fn estimate_tokens(messages: &[ChatMessage]) -> u64 {
    let chars: usize = messages.iter().map(|m| m.content.len()).sum();
    (chars / 4).max(1) as u64
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct DeepSeekClient {
    client: Client,
    config: LlmConfig,
    api_key: String,
    router: ModelRouter,
    limiter: Arc<SlidingWindowLimiter>,
    calls: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    // Micro-cents, so the counter can stay atomic.
    cost_micro_usd: AtomicU64,
}

impl DeepSeekClient {
    pub fn new(
        config: LlmConfig,
        api_key: String,
        limiter: Arc<SlidingWindowLimiter>,
    ) -> Result<Self, ChatError> {
        if api_key.is_empty() {
            return Err(ChatError::MissingApiKey);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Transport(format!("failed to build HTTP client: {e}")))?;
        let router = ModelRouter::new(
            &config.chat_model,
            &config.reasoner_model,
            config.auto_upgrade,
        );
        Ok(Self {
            client,
            config,
            api_key,
            router,
            limiter,
            calls: AtomicU64::new(0),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
            cost_micro_usd: AtomicU64::new(0),
        })
    }

    async fn call_once(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChatReply, ChatError> {
        let request = CompletionRequest {
            model,
            messages,
            temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Transport(format!("HTTP {status}: {body}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| {
                ChatError::MalformedResponse("response has no message content".to_string())
            })?;

        Ok(ChatReply {
            content,
            model: parsed.model.unwrap_or_else(|| model.to_string()),
            usage: parsed.usage.unwrap_or_default(),
        })
    }

    fn record_usage(&self, model: &str, usage: ChatUsage) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.prompt_tokens
            .fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(usage.completion_tokens, Ordering::Relaxed);
        if let Some(pricing) = pricing_for(model) {
            let cost = usage.prompt_tokens as f64 / 1_000_000.0 * pricing.input
                + usage.completion_tokens as f64 / 1_000_000.0 * pricing.output;
            self.cost_micro_usd
                .fetch_add((cost * 1_000_000.0) as u64, Ordering::Relaxed);
        }
    }
}

#[async_trait]
impl ChatClient for DeepSeekClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChatReply, ChatError> {
        let selection = self.router.select(messages);
        if selection.upgraded {
            info!(model = %selection.model, "routing to reasoner model");
        }

        let estimated = estimate_tokens(messages);
        self.limiter.acquire(estimated).await;

        let reply = match self.call_once(&selection.model, messages, temperature).await {
            Ok(reply) => reply,
            // Provider rate limits get a single retry after a fixed
            // pause; everything else propagates.
            Err(e) if e.is_rate_limit() => {
                warn!(error = %e, "provider rate limit, retrying once in 10s");
                tokio::time::sleep(Duration::from_secs(10)).await;
                self.call_once(&selection.model, messages, temperature)
                    .await?
            }
            Err(e) => return Err(e),
        };

        let actual = reply.usage.prompt_tokens + reply.usage.completion_tokens;
        if actual > 0 {
            self.limiter.record_actual(estimated, actual).await;
        }
        self.record_usage(&reply.model, reply.usage);
        debug!(
            model = %reply.model,
            prompt_tokens = reply.usage.prompt_tokens,
            completion_tokens = reply.usage.completion_tokens,
            "chat completion"
        );
        Ok(reply)
    }

    fn stats(&self) -> ChatStats {
        ChatStats {
            calls: self.calls.load(Ordering::Relaxed),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            cost_usd: self.cost_micro_usd.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            rate_limit_waits: self.limiter.wait_count(),
        }
    }
}
