//! Task domain model.
//!
//! Backlog entries with a single optional parent dependency. The backlog
//! is a flat JSON document; ids are monotonic integers assigned by the
//! backlog store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task in the backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is waiting to be picked up
    Todo,
    /// Task is currently being executed by an agent
    InProgress,
    /// Task completed successfully
    Done,
    /// Task failed or was skipped after escalation
    Blocked,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Blocked => "blocked",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

/// Priority rank for scheduling. Lower rank is scheduled first.
///
/// Priorities are stored as free strings in the backlog document; unknown
/// values rank as "medium". Status transitions are deliberately permissive
/// (the store never rejects `done -> todo`), so no transition table exists
/// here.
pub fn priority_rank(priority: &str) -> u8 {
    match priority.to_lowercase().as_str() {
        "critical" => 0,
        "high" => 1,
        "low" => 3,
        _ => 2,
    }
}

/// A unit of work assigned to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Monotonic id, unique within the backlog document
    pub id: u64,
    /// Human-readable title
    pub title: String,
    /// Free-text description fed verbatim into agent prompts
    pub description: String,
    /// Agent name this task is assigned to (not validated)
    pub assigned_to: String,
    /// Current status
    pub status: TaskStatus,
    /// Priority string; ranked via [`priority_rank`]
    pub priority: String,
    /// Optional single parent task that must be `done` first
    pub depends_on: Option<u64>,
    /// When created
    pub created_at: DateTime<Utc>,
    /// Set when status becomes `done`
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Rank of this task's priority (0 = critical .. 3 = low).
    pub fn rank(&self) -> u8 {
        priority_rank(&self.priority)
    }

    /// Whether this task still needs work.
    pub fn is_open(&self) -> bool {
        matches!(self.status, TaskStatus::Todo | TaskStatus::InProgress)
    }
}

/// A task proposed by the auto-planner before it receives an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assigned_to: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "medium".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rank_ordering() {
        assert_eq!(priority_rank("critical"), 0);
        assert_eq!(priority_rank("high"), 1);
        assert_eq!(priority_rank("medium"), 2);
        assert_eq!(priority_rank("low"), 3);
    }

    #[test]
    fn test_priority_rank_unknown_defaults_to_medium() {
        assert_eq!(priority_rank("urgent"), 2);
        assert_eq!(priority_rank(""), 2);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::Done,
            TaskStatus::Blocked,
        ] {
            assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::from_str("cancelled"), None);
    }

    #[test]
    fn test_is_open() {
        let mut task = Task {
            id: 1,
            title: "t".into(),
            description: String::new(),
            assigned_to: "engineer".into(),
            status: TaskStatus::Todo,
            priority: "high".into(),
            depends_on: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        assert!(task.is_open());
        task.status = TaskStatus::Done;
        assert!(!task.is_open());
    }
}
