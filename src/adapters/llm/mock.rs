//! Scripted chat client for tests and dry runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::models::{ChatMessage, ChatReply, ChatStats, ChatUsage};
use crate::domain::ports::{ChatClient, ChatError};

/// Replays a fixed sequence of replies; once the script runs out, every
/// further call returns a benign acknowledgement.
pub struct MockChatClient {
    replies: Mutex<Vec<String>>,
    calls: AtomicU64,
    transcripts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatClient {
    pub fn new(replies: Vec<String>) -> Self {
        let mut script = replies;
        script.reverse();
        Self {
            replies: Mutex::new(script),
            calls: AtomicU64::new(0),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    pub fn scripted(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(ToString::to_string).collect())
    }

    /// Every conversation this client has been sent, in order.
    pub fn transcripts(&self) -> Vec<Vec<ChatMessage>> {
        self.transcripts.lock().expect("transcript lock").clone()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<ChatReply, ChatError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.transcripts
            .lock()
            .expect("transcript lock")
            .push(messages.to_vec());
        let content = self
            .replies
            .lock()
            .expect("replies lock")
            .pop()
            .unwrap_or_else(|| "Understood.".to_string());
        Ok(ChatReply {
            content,
            model: "mock".to_string(),
            usage: ChatUsage {
                prompt_tokens: 10,
                completion_tokens: 10,
            },
        })
    }

    fn stats(&self) -> ChatStats {
        let calls = self.calls.load(Ordering::Relaxed);
        ChatStats {
            calls,
            prompt_tokens: calls * 10,
            completion_tokens: calls * 10,
            cost_usd: 0.0,
            rate_limit_waits: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_then_default() {
        let client = MockChatClient::scripted(&["first", "second"]);
        let a = client.chat(&[ChatMessage::user("x")], 0.7).await.unwrap();
        let b = client.chat(&[ChatMessage::user("y")], 0.7).await.unwrap();
        let c = client.chat(&[ChatMessage::user("z")], 0.7).await.unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(c.content, "Understood.");
        assert_eq!(client.stats().calls, 3);
    }
}
