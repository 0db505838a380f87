//! Per-agent health metrics and warning thresholds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default limits: five minutes per task, five error streak, 50k tokens.
pub const DEFAULT_MAX_TASK_SECS: u64 = 300;
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 5;
pub const DEFAULT_MAX_TOKENS_PER_AGENT: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthWarningKind {
    Stuck,
    ErrorStreak,
    HighTokenUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthWarning {
    pub agent: String,
    pub kind: HealthWarningKind,
    pub message: String,
    pub severity: Severity,
}

/// Rolling metrics for one agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_started_at: Option<DateTime<Utc>>,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub consecutive_errors: u32,
    pub total_time_secs: f64,
    pub avg_task_time_secs: f64,
    pub token_usage: u64,
    pub restarts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl AgentMetrics {
    pub fn idle() -> Self {
        Self {
            status: "idle".to_string(),
            last_activity: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Recompute the running average after a finished task.
    pub fn record_finished(&mut self, elapsed_secs: f64, success: bool, tokens: u64) {
        self.status = "idle".to_string();
        self.current_task = None;
        self.task_started_at = None;
        self.token_usage += tokens;
        self.total_time_secs += elapsed_secs;
        self.last_activity = Some(Utc::now());
        if success {
            self.tasks_completed += 1;
            self.consecutive_errors = 0;
        } else {
            self.tasks_failed += 1;
            self.consecutive_errors += 1;
        }
        let total = (self.tasks_completed + self.tasks_failed).max(1);
        self.avg_task_time_secs = self.total_time_secs / total as f64;
    }
}

/// Whole-document health snapshot, keyed by agent name. BTreeMap keeps
/// the serialized document stable across saves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthDoc {
    pub agents: BTreeMap<String, AgentMetrics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_streak_resets_on_success() {
        let mut m = AgentMetrics::idle();
        m.record_finished(10.0, false, 100);
        m.record_finished(10.0, false, 100);
        assert_eq!(m.consecutive_errors, 2);
        m.record_finished(10.0, true, 100);
        assert_eq!(m.consecutive_errors, 0);
        assert_eq!(m.tasks_completed, 1);
        assert_eq!(m.tasks_failed, 2);
    }

    #[test]
    fn test_average_task_time() {
        let mut m = AgentMetrics::idle();
        m.record_finished(30.0, true, 0);
        m.record_finished(60.0, true, 0);
        assert!((m.avg_task_time_secs - 45.0).abs() < f64::EPSILON);
    }
}
