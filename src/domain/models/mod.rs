pub mod agent;
pub mod chat;
pub mod checkpoint;
pub mod command;
pub mod config;
pub mod health;
pub mod memory;
pub mod task;
pub mod trading;
pub mod vote;

pub use agent::{AgentRole, AgentState, AgentStatus};
pub use chat::{ChatMessage, ChatReply, ChatRole, ChatStats, ChatUsage};
pub use checkpoint::{CheckpointDoc, PhaseMark, RunPhase};
pub use command::ToolCommand;
pub use config::{
    Config, HttpConfig, LlmConfig, LoggingConfig, PipelineConfig, RateLimitConfig, TelegramConfig,
    TradingConfig,
};
pub use health::{AgentMetrics, HealthDoc, HealthWarning, HealthWarningKind, Severity};
pub use memory::{
    AgentMemoryDoc, FailureRecord, Insight, PatternRecord, SharedMemoryDoc, StrategyResult,
    WarningRecord,
};
pub use task::{PlannedTask, Task, TaskStatus, priority_rank};
pub use trading::{
    ClosedTrade, LeaderboardDoc, PortfolioDoc, PortfolioSummary, Position, StrategyEntry,
};
pub use vote::{Ballot, Proposal, ProposalStatus, TallyOutcome, VoteDecision};
