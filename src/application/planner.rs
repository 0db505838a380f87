//! LLM-driven planning: proposing follow-up tasks after a pipeline and
//! deciding what to do with a task that exhausted its retries.
//!
//! Model replies are free text; both operations degrade to safe
//! defaults (canned tasks, SKIP) when the reply cannot be used.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::models::{AgentRole, ChatMessage, PlannedTask, Task};
use crate::domain::ports::ChatClient;

/// What to do with a task whose retry rounds are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationDecision {
    Skip,
    Reassign,
    Split,
}

pub struct Planner {
    chat: Arc<dyn ChatClient>,
    temperature: f32,
}

impl Planner {
    pub fn new(chat: Arc<dyn ChatClient>, temperature: f32) -> Self {
        Self { chat, temperature }
    }

    /// Ask the model for 3-5 follow-up tasks given what was just
    /// completed and what is in the workspace. Unusable replies fall
    /// back to the canned pool.
    pub async fn propose_tasks(
        &self,
        completed_titles: &[String],
        workspace_files: &[String],
    ) -> Vec<PlannedTask> {
        let prompt = format!(
            "The team just completed these tasks:\n{}\n\nWorkspace files:\n{}\n\n\
             Propose 3 to 5 new follow-up tasks that build on this work. \
             Reply with ONLY a JSON array, no prose:\n\
             [{{\"title\": \"...\", \"description\": \"...\", \
             \"assigned_to\": \"data_scientist|quant_analyst|engineer|devops|risk_manager\", \
             \"priority\": \"critical|high|medium|low\"}}]",
            completed_titles.join("\n"),
            workspace_files.join("\n"),
        );
        let messages = [
            ChatMessage::system(
                "You are the Project Manager of an automated trading research team. \
                 You plan concrete, runnable work for the next pipeline cycle.",
            ),
            ChatMessage::user(prompt),
        ];

        let reply = match self.chat.chat(&messages, self.temperature).await {
            Ok(reply) => reply.content,
            Err(e) => {
                warn!(error = %e, "auto-plan chat failed, using canned tasks");
                return canned_tasks();
            }
        };

        match parse_planned_tasks(&reply) {
            Some(tasks) if !tasks.is_empty() => {
                info!(count = tasks.len(), "auto-plan proposed tasks");
                tasks
            }
            _ => {
                warn!("auto-plan reply unparseable, using canned tasks");
                canned_tasks()
            }
        }
    }

    /// SKIP / REASSIGN / SPLIT for a stuck task; SKIP when the reply
    /// names none of the three or the call fails.
    pub async fn escalation_decision(&self, task: &Task, error: &str) -> EscalationDecision {
        let prompt = format!(
            "Task #{id} '{title}' (assigned to {agent}) failed after all retry rounds.\n\
             Last error:\n{error}\n\n\
             Choose exactly one action:\n\
             SKIP - mark the task blocked and move on\n\
             REASSIGN - give the task to a different agent\n\
             SPLIT - break the task into two smaller tasks\n\
             Reply with the chosen keyword and a one-line reason.",
            id = task.id,
            title = task.title,
            agent = task.assigned_to,
        );
        let messages = [
            ChatMessage::system(
                "You are the Project Manager deciding how to handle a stuck task. \
                 Be decisive.",
            ),
            ChatMessage::user(prompt),
        ];

        let reply = match self.chat.chat(&messages, self.temperature).await {
            Ok(reply) => reply.content.to_uppercase(),
            Err(e) => {
                warn!(task_id = task.id, error = %e, "escalation chat failed, defaulting to SKIP");
                return EscalationDecision::Skip;
            }
        };

        let decision = if reply.contains("REASSIGN") {
            EscalationDecision::Reassign
        } else if reply.contains("SPLIT") {
            EscalationDecision::Split
        } else {
            EscalationDecision::Skip
        };
        info!(task_id = task.id, ?decision, "escalation decision");
        decision
    }
}

/// Pull a JSON array out of a reply that may wrap it in prose or a
/// code fence, then keep only tasks assigned to a real role.
fn parse_planned_tasks(reply: &str) -> Option<Vec<PlannedTask>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end <= start {
        return None;
    }
    let tasks: Vec<PlannedTask> = serde_json::from_str(&reply[start..=end]).ok()?;
    let tasks: Vec<PlannedTask> = tasks
        .into_iter()
        .filter(|t| AgentRole::from_str(&t.assigned_to).is_some())
        .take(5)
        .collect();
    Some(tasks)
}

/// Fixed follow-up pool used when the model cannot produce a plan.
fn canned_tasks() -> Vec<PlannedTask> {
    vec![
        PlannedTask {
            title: "Validate feature data quality".to_string(),
            description: "Write a script that checks eurusd_features.csv for NaN values, \
                          gaps in the date index, and outlier returns. Print a summary."
                .to_string(),
            assigned_to: "data_scientist".to_string(),
            priority: "high".to_string(),
        },
        PlannedTask {
            title: "Add walk-forward analysis to the backtest".to_string(),
            description: "Extend backtest_sma.py with a rolling train/test split and report \
                          per-window Sharpe ratios."
                .to_string(),
            assigned_to: "quant_analyst".to_string(),
            priority: "high".to_string(),
        },
        PlannedTask {
            title: "Write unit tests for the backtest engine".to_string(),
            description: "Create test_backtest.py covering trade entry, exit, and PnL \
                          arithmetic with a tiny synthetic price series."
                .to_string(),
            assigned_to: "engineer".to_string(),
            priority: "medium".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::mock::MockChatClient;
    use chrono::Utc;
    use crate::domain::models::TaskStatus;

    fn stuck_task() -> Task {
        Task {
            id: 4,
            title: "Write backtest engine".into(),
            description: String::new(),
            assigned_to: "engineer".into(),
            status: TaskStatus::InProgress,
            priority: "high".into(),
            depends_on: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_propose_tasks_parses_json_array() {
        let reply = r#"Here is my plan:
[
  {"title": "Tune RSI window", "description": "Grid search 10-20", "assigned_to": "quant_analyst", "priority": "high"},
  {"title": "Archive old CSVs", "description": "Move stale data", "assigned_to": "devops", "priority": "low"}
]"#;
        let planner = Planner::new(Arc::new(MockChatClient::scripted(&[reply])), 0.7);
        let tasks = planner.propose_tasks(&["Download data".into()], &[]).await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Tune RSI window");
        assert_eq!(tasks[1].assigned_to, "devops");
    }

    #[tokio::test]
    async fn test_propose_tasks_drops_unknown_assignees() {
        let reply = r#"[
  {"title": "A", "description": "", "assigned_to": "ceo", "priority": "high"},
  {"title": "B", "description": "", "assigned_to": "engineer", "priority": "high"}
]"#;
        let planner = Planner::new(Arc::new(MockChatClient::scripted(&[reply])), 0.7);
        let tasks = planner.propose_tasks(&[], &[]).await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "B");
    }

    #[tokio::test]
    async fn test_propose_tasks_falls_back_on_prose() {
        let planner = Planner::new(
            Arc::new(MockChatClient::scripted(&["I think we should focus on testing."])),
            0.7,
        );
        let tasks = planner.propose_tasks(&[], &[]).await;
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].assigned_to, "data_scientist");
    }

    #[tokio::test]
    async fn test_escalation_keywords() {
        for (reply, expected) in [
            ("REASSIGN - the engineer is overloaded", EscalationDecision::Reassign),
            ("I suggest we split this: SPLIT", EscalationDecision::Split),
            ("skip it for now", EscalationDecision::Skip),
            ("let us think about it more", EscalationDecision::Skip),
        ] {
            let planner = Planner::new(Arc::new(MockChatClient::scripted(&[reply])), 0.7);
            let decision = planner.escalation_decision(&stuck_task(), "boom").await;
            assert_eq!(decision, expected, "reply: {reply}");
        }
    }
}
