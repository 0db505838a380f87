//! Adapters: LLM backends, JSON stores, notifications, HTTP surfaces.

pub mod http;
pub mod llm;
pub mod store;
pub mod telegram;

pub use telegram::TelegramNotifier;
