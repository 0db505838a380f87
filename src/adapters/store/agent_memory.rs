//! Per-agent persistent memory: key/value facts plus a capped failure
//! history fed back into retry prompts.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::memory::{AgentMemoryDoc, FAILURE_CAP, FailureRecord};

use super::document::JsonDocument;

pub struct AgentMemory {
    agent_name: String,
    doc: JsonDocument<AgentMemoryDoc>,
}

impl AgentMemory {
    /// Memory lives at `<memory_dir>/<agent>.json`.
    pub fn new(agent_name: &str, memory_dir: impl AsRef<Path>) -> Self {
        let path: PathBuf = memory_dir.as_ref().join(format!("{agent_name}.json"));
        Self {
            agent_name: agent_name.to_string(),
            doc: JsonDocument::new(path),
        }
    }

    pub fn remember_fact(&self, key: &str, value: &str) -> DomainResult<String> {
        self.doc
            .update(|data| data.facts.insert(key.to_string(), value.to_string()))?;
        debug!(agent = %self.agent_name, key, "stored fact");
        Ok(format!("Fact stored: {key} = {value}"))
    }

    pub fn recall_fact(&self, key: &str) -> DomainResult<String> {
        let data = self.doc.load()?;
        Ok(match data.facts.get(key) {
            Some(value) => format!("Recalled: {key} = {value}"),
            None => format!("I don't remember anything about '{key}'."),
        })
    }

    /// All facts as a prompt-ready block.
    pub fn all_facts(&self) -> DomainResult<String> {
        let data = self.doc.load()?;
        if data.facts.is_empty() {
            return Ok("My memory is empty.".to_string());
        }
        let mut summary = String::from("Known Facts:\n");
        let mut keys: Vec<_> = data.facts.keys().collect();
        keys.sort();
        for k in keys {
            summary.push_str(&format!("- {k}: {}\n", data.facts[k]));
        }
        Ok(summary)
    }

    /// Record a failed task attempt, keeping the most recent entries.
    pub fn record_failure(&self, task: &str, error: &str, round: u32) -> DomainResult<()> {
        self.doc.update(|data| {
            data.failures.push(FailureRecord {
                task: task.to_string(),
                error: error.to_string(),
                round,
                timestamp: Utc::now(),
            });
            let len = data.failures.len();
            if len > FAILURE_CAP {
                data.failures.drain(..len - FAILURE_CAP);
            }
        })
    }

    /// Prompt-ready block of past failures whose task mentions `keyword`.
    /// Empty string when nothing matches.
    pub fn failure_history(&self, keyword: &str) -> DomainResult<String> {
        let keyword = keyword.to_lowercase();
        let data = self.doc.load()?;
        let matching: Vec<&FailureRecord> = data
            .failures
            .iter()
            .filter(|f| f.task.to_lowercase().contains(&keyword))
            .collect();
        if matching.is_empty() {
            return Ok(String::new());
        }
        let mut block = String::from("PAST FAILURES on similar tasks (avoid repeating these):\n");
        for f in matching.iter().rev().take(3) {
            block.push_str(&format!("- {} (round {}): {}\n", f.task, f.round, f.error));
        }
        Ok(block)
    }

    /// Recent failures for the same task title, for retry context.
    pub fn failures_for(&self, task: &str, limit: usize) -> DomainResult<Vec<FailureRecord>> {
        let data = self.doc.load()?;
        let mut matching: Vec<FailureRecord> = data
            .failures
            .into_iter()
            .filter(|f| f.task == task)
            .collect();
        let len = matching.len();
        if len > limit {
            matching.drain(..len - limit);
        }
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fact_round_trip() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new("engineer", dir.path());
        assert_eq!(
            memory.remember_fact("sma_window", "20").unwrap(),
            "Fact stored: sma_window = 20"
        );
        assert_eq!(
            memory.recall_fact("sma_window").unwrap(),
            "Recalled: sma_window = 20"
        );
    }

    #[test]
    fn test_recall_unknown_fact() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new("engineer", dir.path());
        assert_eq!(
            memory.recall_fact("nothing").unwrap(),
            "I don't remember anything about 'nothing'."
        );
    }

    #[test]
    fn test_empty_memory_summary() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new("engineer", dir.path());
        assert_eq!(memory.all_facts().unwrap(), "My memory is empty.");
    }

    #[test]
    fn test_failure_history_is_capped() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new("engineer", dir.path());
        for i in 0..(FAILURE_CAP + 5) {
            memory
                .record_failure("build features", &format!("error {i}"), 1)
                .unwrap();
        }
        let failures = memory.failures_for("build features", 100).unwrap();
        assert_eq!(failures.len(), FAILURE_CAP);
        assert_eq!(failures.last().unwrap().error, format!("error {}", FAILURE_CAP + 4));
    }

    #[test]
    fn test_failure_history_keyword_match() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new("engineer", dir.path());
        memory
            .record_failure("Download EURUSD data", "timeout", 3)
            .unwrap();
        let history = memory.failure_history("download").unwrap();
        assert!(history.contains("PAST FAILURES"));
        assert!(history.contains("timeout"));
        assert_eq!(memory.failure_history("backtest").unwrap(), "");
    }

    #[test]
    fn test_failures_filtered_by_task() {
        let dir = TempDir::new().unwrap();
        let memory = AgentMemory::new("engineer", dir.path());
        memory.record_failure("task a", "boom", 1).unwrap();
        memory.record_failure("task b", "bang", 2).unwrap();
        let failures = memory.failures_for("task a", 5).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error, "boom");
    }
}
