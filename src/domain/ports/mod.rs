//! Port trait definitions
//!
//! Async trait interfaces the adapters implement:
//! - `ChatClient`: chat-completion backend
//! - `PriceFeed`: price source for paper trading
//!
//! These contracts keep the application layer independent of any
//! specific provider or transport.

pub mod chat_client;
pub mod price_feed;

pub use chat_client::{ChatClient, ChatError};
pub use price_feed::{PriceFeed, RandomWalkFeed, StaticFeed};
