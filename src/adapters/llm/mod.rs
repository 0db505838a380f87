//! LLM backend adapters.

pub mod deepseek;
pub mod mock;
pub mod rate_limiter;

pub use deepseek::DeepSeekClient;
pub use mock::MockChatClient;
pub use rate_limiter::SlidingWindowLimiter;
