//! Agent health monitor: task timing, token usage, error streaks.

use std::path::PathBuf;

use chrono::Utc;
use tracing::warn;

use crate::domain::errors::DomainResult;
use crate::domain::models::health::{
    AgentMetrics, DEFAULT_MAX_CONSECUTIVE_ERRORS, DEFAULT_MAX_TASK_SECS,
    DEFAULT_MAX_TOKENS_PER_AGENT, HealthDoc, HealthWarning, HealthWarningKind, Severity,
};

use super::document::JsonDocument;

pub struct HealthMonitor {
    doc: JsonDocument<HealthDoc>,
    max_task_secs: u64,
    max_consecutive_errors: u32,
    max_tokens: u64,
}

impl HealthMonitor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::new(path),
            max_task_secs: DEFAULT_MAX_TASK_SECS,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            max_tokens: DEFAULT_MAX_TOKENS_PER_AGENT,
        }
    }

    pub fn with_limits(mut self, max_task_secs: u64, max_errors: u32, max_tokens: u64) -> Self {
        self.max_task_secs = max_task_secs;
        self.max_consecutive_errors = max_errors;
        self.max_tokens = max_tokens;
        self
    }

    pub fn register_agent(&self, agent_name: &str) -> DomainResult<()> {
        self.doc.update(|data| {
            data.agents
                .entry(agent_name.to_string())
                .or_insert_with(AgentMetrics::idle);
        })
    }

    pub fn task_started(&self, agent_name: &str, task_title: &str) -> DomainResult<()> {
        self.doc.update(|data| {
            let agent = data
                .agents
                .entry(agent_name.to_string())
                .or_insert_with(AgentMetrics::idle);
            agent.status = "working".to_string();
            agent.current_task = Some(task_title.to_string());
            agent.task_started_at = Some(Utc::now());
            agent.last_activity = Some(Utc::now());
        })
    }

    pub fn task_completed(
        &self,
        agent_name: &str,
        success: bool,
        tokens_used: u64,
    ) -> DomainResult<()> {
        self.doc.update(|data| {
            if let Some(agent) = data.agents.get_mut(agent_name) {
                let elapsed = agent
                    .task_started_at
                    .map(|t| (Utc::now() - t).num_milliseconds() as f64 / 1000.0)
                    .unwrap_or(0.0);
                agent.record_finished(elapsed, success, tokens_used);
            }
        })
    }

    pub fn mark_restart(&self, agent_name: &str) -> DomainResult<()> {
        self.doc.update(|data| {
            if let Some(agent) = data.agents.get_mut(agent_name) {
                agent.restarts += 1;
                agent.consecutive_errors = 0;
                agent.status = "restarting".to_string();
                agent.last_activity = Some(Utc::now());
            }
        })
    }

    /// Sweep all agents for stuck tasks, error streaks, and token burn.
    pub fn check_health(&self) -> DomainResult<Vec<HealthWarning>> {
        let data = self.doc.load()?;
        let mut warnings = Vec::new();
        for (name, agent) in &data.agents {
            if agent.status == "working" {
                if let Some(started) = agent.task_started_at {
                    let elapsed = (Utc::now() - started).num_seconds();
                    if elapsed > self.max_task_secs as i64 {
                        let task = agent.current_task.as_deref().unwrap_or("unknown");
                        warnings.push(HealthWarning {
                            agent: name.clone(),
                            kind: HealthWarningKind::Stuck,
                            message: format!("{name} stuck for {elapsed}s on: {task}"),
                            severity: Severity::High,
                        });
                    }
                }
            }
            if agent.consecutive_errors >= self.max_consecutive_errors {
                warnings.push(HealthWarning {
                    agent: name.clone(),
                    kind: HealthWarningKind::ErrorStreak,
                    message: format!(
                        "{name} has {} consecutive errors",
                        agent.consecutive_errors
                    ),
                    severity: Severity::High,
                });
            }
            if agent.token_usage as f64 > self.max_tokens as f64 * 0.8 {
                warnings.push(HealthWarning {
                    agent: name.clone(),
                    kind: HealthWarningKind::HighTokenUsage,
                    message: format!("{name} high token usage: {}", agent.token_usage),
                    severity: Severity::Medium,
                });
            }
        }
        for w in &warnings {
            warn!(agent = %w.agent, kind = ?w.kind, "{}", w.message);
        }
        Ok(warnings)
    }

    pub fn status_all(&self) -> DomainResult<HealthDoc> {
        self.doc.load()
    }

    pub fn summary_text(&self) -> DomainResult<String> {
        let data = self.doc.load()?;
        if data.agents.is_empty() {
            return Ok("No agents registered".to_string());
        }
        let mut lines = vec!["Agent Health:".to_string()];
        for (name, a) in &data.agents {
            lines.push(format!(
                "  {name}: {} | Done:{} Fail:{} | Avg:{:.0}s | Tokens:{}",
                a.status, a.tasks_completed, a.tasks_failed, a.avg_task_time_secs, a.token_usage
            ));
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn monitor(dir: &TempDir) -> HealthMonitor {
        HealthMonitor::new(dir.path().join("agent_health.json"))
    }

    #[test]
    fn test_task_lifecycle_updates_counters() {
        let dir = TempDir::new().unwrap();
        let health = monitor(&dir);
        health.register_agent("engineer").unwrap();
        health.task_started("engineer", "build features").unwrap();
        health.task_completed("engineer", true, 1200).unwrap();

        let doc = health.status_all().unwrap();
        let agent = &doc.agents["engineer"];
        assert_eq!(agent.tasks_completed, 1);
        assert_eq!(agent.token_usage, 1200);
        assert_eq!(agent.status, "idle");
    }

    #[test]
    fn test_error_streak_warning() {
        let dir = TempDir::new().unwrap();
        let health = monitor(&dir).with_limits(300, 3, 50_000);
        health.register_agent("devops").unwrap();
        for _ in 0..3 {
            health.task_started("devops", "deploy").unwrap();
            health.task_completed("devops", false, 0).unwrap();
        }
        let warnings = health.check_health().unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.kind == HealthWarningKind::ErrorStreak && w.agent == "devops"));
    }

    #[test]
    fn test_token_usage_warning_at_eighty_percent() {
        let dir = TempDir::new().unwrap();
        let health = monitor(&dir).with_limits(300, 5, 1000);
        health.task_started("engineer", "t").unwrap();
        health.task_completed("engineer", true, 900).unwrap();
        let warnings = health.check_health().unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.kind == HealthWarningKind::HighTokenUsage));
    }

    #[test]
    fn test_restart_clears_streak() {
        let dir = TempDir::new().unwrap();
        let health = monitor(&dir).with_limits(300, 1, 50_000);
        health.task_started("engineer", "t").unwrap();
        health.task_completed("engineer", false, 0).unwrap();
        assert!(!health.check_health().unwrap().is_empty());
        health.mark_restart("engineer").unwrap();
        assert!(health.check_health().unwrap().is_empty());
    }
}
