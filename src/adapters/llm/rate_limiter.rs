//! Sliding-window rate limiter for outbound chat calls.
//!
//! Tracks calls and token counts over a 60-second window. When either
//! ceiling would be exceeded, `acquire` suspends the caller until the
//! oldest window entry expires. The wait is an awaited suspension, so
//! other tasks keep running.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(60);

struct WindowEntry {
    at: Instant,
    tokens: u64,
}

pub struct SlidingWindowLimiter {
    max_calls: u32,
    max_tokens: u64,
    entries: Mutex<VecDeque<WindowEntry>>,
    waits: AtomicU64,
}

impl SlidingWindowLimiter {
    pub fn new(max_calls: u32, max_tokens: u64) -> Arc<Self> {
        Arc::new(Self {
            max_calls,
            max_tokens,
            entries: Mutex::new(VecDeque::new()),
            waits: AtomicU64::new(0),
        })
    }

    /// Reserve a slot for one call of `estimated_tokens`, waiting out
    /// the window if necessary. Counted as one wait per acquire that
    /// had to sleep, regardless of how many entries had to expire.
    pub async fn acquire(&self, estimated_tokens: u64) {
        let mut waited = false;
        loop {
            let wait_until = {
                let mut entries = self.entries.lock().await;
                let now = Instant::now();
                while entries
                    .front()
                    .is_some_and(|e| now.duration_since(e.at) >= WINDOW)
                {
                    entries.pop_front();
                }

                let used_tokens: u64 = entries.iter().map(|e| e.tokens).sum();
                let over_calls = entries.len() >= self.max_calls as usize;
                let over_tokens = used_tokens + estimated_tokens > self.max_tokens
                    && !entries.is_empty();

                if over_calls || over_tokens {
                    entries.front().map(|e| e.at + WINDOW)
                } else {
                    entries.push_back(WindowEntry {
                        at: now,
                        tokens: estimated_tokens,
                    });
                    None
                }
            };

            match wait_until {
                Some(deadline) => {
                    if !waited {
                        self.waits.fetch_add(1, Ordering::Relaxed);
                        waited = true;
                    }
                    debug!("rate limit window full, waiting");
                    tokio::time::sleep_until(deadline).await;
                }
                None => return,
            }
        }
    }

    /// Replace a reservation's token estimate with the actual count
    /// once the provider reports usage.
    pub async fn record_actual(&self, estimated_tokens: u64, actual_tokens: u64) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries
            .iter_mut()
            .rev()
            .find(|e| e.tokens == estimated_tokens)
        {
            entry.tokens = actual_tokens;
        }
    }

    /// How many acquires had to wait.
    pub fn wait_count(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }
}
