//! JSON-file-backed stores. Each store owns one whole-document file and
//! rewrites it on every mutation.

pub mod agent_memory;
pub mod backlog;
pub mod checkpoint;
pub mod document;
pub mod health;
pub mod leaderboard;
pub mod paper_trading;
pub mod shared_memory;
pub mod votes;

pub use agent_memory::AgentMemory;
pub use backlog::{BacklogDoc, BacklogManager};
pub use checkpoint::CheckpointStore;
pub use document::JsonDocument;
pub use health::HealthMonitor;
pub use leaderboard::Leaderboard;
pub use paper_trading::{PaperTrader, TradeOutcome};
pub use shared_memory::SharedMemory;
pub use votes::{VoteStore, VotesDoc};
