//! Checkpoint store: records run phases so an interrupted run can be
//! diagnosed and resumed after a restart.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{CheckpointDoc, RunPhase};

use super::document::JsonDocument;

pub struct CheckpointStore {
    doc: JsonDocument<CheckpointDoc>,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    /// Start a new run, reporting whether the previous one was cut off.
    pub fn begin_run(&self, run_id: &str) -> DomainResult<Option<RunPhase>> {
        let previous = self.doc.load()?;
        let interrupted = if previous.was_interrupted() {
            let phase = previous.last_phase();
            warn!(
                run_id = previous.run_id.as_deref().unwrap_or("unknown"),
                last_phase = phase.map_or("none", |p| p.as_str()),
                "previous run did not shut down cleanly"
            );
            phase
        } else {
            None
        };
        let mut fresh = CheckpointDoc::begin(run_id.to_string());
        fresh.crash_count = previous.crash_count;
        fresh.last_crash = previous.last_crash;
        self.doc.save(&fresh)?;
        Ok(interrupted)
    }

    pub fn mark_phase(&self, phase: RunPhase) -> DomainResult<()> {
        self.doc.update(|cp| cp.mark(phase))?;
        info!(phase = phase.as_str(), "checkpoint");
        Ok(())
    }

    pub fn mark_round(&self, round: u32) -> DomainResult<()> {
        self.doc.update(|cp| cp.last_round = round)
    }

    pub fn record_completed_task(&self, title: &str) -> DomainResult<()> {
        self.doc
            .update(|cp| cp.completed_tasks.push(title.to_string()))
    }

    /// Bump the crash counter with the error text that took the run down.
    pub fn record_crash(&self, error: &str) -> DomainResult<()> {
        self.doc.update(|cp| {
            cp.crash_count += 1;
            cp.last_crash = Some(error.to_string());
        })
    }

    pub fn load(&self) -> DomainResult<CheckpointDoc> {
        self.doc.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_interruption_detected_across_runs() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));

        assert_eq!(store.begin_run("run-1").unwrap(), None);
        store.mark_phase(RunPhase::Startup).unwrap();
        store.mark_phase(RunPhase::Pipeline).unwrap();
        // No shutdown mark: the next run sees the interruption.
        assert_eq!(store.begin_run("run-2").unwrap(), Some(RunPhase::Pipeline));

        store.mark_phase(RunPhase::Shutdown).unwrap();
        assert_eq!(store.begin_run("run-3").unwrap(), None);
    }

    #[test]
    fn test_round_progress_persists() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
        store.begin_run("run-1").unwrap();
        store.mark_round(4).unwrap();
        assert_eq!(store.load().unwrap().last_round, 4);
    }

    #[test]
    fn test_crash_count_survives_new_runs() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.json"));
        store.begin_run("run-1").unwrap();
        store.record_crash("boom").unwrap();
        store.begin_run("run-2").unwrap();
        let cp = store.load().unwrap();
        assert_eq!(cp.crash_count, 1);
        assert_eq!(cp.last_crash.as_deref(), Some("boom"));
        assert!(cp.completed_tasks.is_empty());
    }
}
