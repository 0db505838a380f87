//! Run checkpoint for crash recovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named phases of an orchestration run, recorded in order so a restart
/// can tell how far the previous run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Startup,
    Standup,
    Seeding,
    Pipeline,
    Reporting,
    Shutdown,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Standup => "standup",
            Self::Seeding => "seeding",
            Self::Pipeline => "pipeline",
            Self::Reporting => "reporting",
            Self::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseMark {
    pub phase: RunPhase,
    pub at: DateTime<Utc>,
}

/// Whole-document checkpoint state, persisted after each phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDoc {
    pub run_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub phases: Vec<PhaseMark>,
    pub last_round: u32,
    pub clean_shutdown: bool,
    /// Titles of tasks completed during this run, in completion order.
    #[serde(default)]
    pub completed_tasks: Vec<String>,
    /// Crash counter surviving across runs.
    #[serde(default)]
    pub crash_count: u32,
    #[serde(default)]
    pub last_crash: Option<String>,
}

impl CheckpointDoc {
    pub fn begin(run_id: String) -> Self {
        Self {
            run_id: Some(run_id),
            started_at: Some(Utc::now()),
            phases: Vec::new(),
            last_round: 0,
            clean_shutdown: false,
            completed_tasks: Vec::new(),
            crash_count: 0,
            last_crash: None,
        }
    }

    pub fn mark(&mut self, phase: RunPhase) {
        self.phases.push(PhaseMark { phase, at: Utc::now() });
        if phase == RunPhase::Shutdown {
            self.clean_shutdown = true;
        }
    }

    /// The last recorded phase, if any.
    pub fn last_phase(&self) -> Option<RunPhase> {
        self.phases.last().map(|m| m.phase)
    }

    /// A prior run that never marked shutdown is treated as interrupted.
    pub fn was_interrupted(&self) -> bool {
        self.run_id.is_some() && !self.clean_shutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_run_detected() {
        let mut cp = CheckpointDoc::begin("run-1".into());
        cp.mark(RunPhase::Startup);
        cp.mark(RunPhase::Pipeline);
        assert!(cp.was_interrupted());
        assert_eq!(cp.last_phase(), Some(RunPhase::Pipeline));

        cp.mark(RunPhase::Shutdown);
        assert!(!cp.was_interrupted());
    }

    #[test]
    fn test_empty_checkpoint_is_not_interrupted() {
        assert!(!CheckpointDoc::default().was_interrupted());
    }
}
