//! Memory documents: per-agent fact/failure stores and the cross-agent
//! shared memory scratchpad.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cap on retained failure records per agent.
pub const FAILURE_CAP: usize = 30;
/// Cap on retained shared patterns.
pub const PATTERN_CAP: usize = 50;
/// Cap on retained shared warnings.
pub const WARNING_CAP: usize = 20;

/// A past task failure, consulted before retrying similar work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub task: String,
    pub error: String,
    pub round: u32,
    pub timestamp: DateTime<Utc>,
}

/// Per-agent memory document (`memory/<agent>.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMemoryDoc {
    #[serde(default)]
    pub facts: HashMap<String, String>,
    #[serde(default)]
    pub failures: Vec<FailureRecord>,
}

/// A keyed insight another agent may consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub value: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// A discovered pattern with a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub pattern: String,
    pub confidence: f64,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// Backtest metrics for a named strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    #[serde(default)]
    pub sharpe_ratio: f64,
    #[serde(default)]
    pub max_drawdown: Option<f64>,
    /// Any additional metrics reported by the author.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// A system-wide warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub warning: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// Shared memory document (`shared_memory.json`).
///
/// Insights and strategies are keyed maps with last-write-wins overwrite;
/// patterns and warnings are capped lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedMemoryDoc {
    #[serde(default)]
    pub insights: HashMap<String, Insight>,
    #[serde(default)]
    pub patterns: Vec<PatternRecord>,
    #[serde(default)]
    pub strategies: HashMap<String, StrategyResult>,
    #[serde(default)]
    pub warnings: Vec<WarningRecord>,
}
