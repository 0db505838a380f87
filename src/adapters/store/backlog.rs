//! Task backlog over a whole-document JSON store.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, TaskStatus};

use super::document::JsonDocument;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogDoc {
    pub tasks: Vec<Task>,
    pub next_id: u64,
}

impl Default for BacklogDoc {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }
}

/// Manages the shared task queue agents pull work from.
pub struct BacklogManager {
    doc: JsonDocument<BacklogDoc>,
}

impl BacklogManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    /// Append a task and assign it the next id.
    pub fn add_task(
        &self,
        title: &str,
        assigned_to: &str,
        priority: &str,
        description: &str,
        depends_on: Option<u64>,
    ) -> DomainResult<Task> {
        let task = self.doc.update(|data| {
            let task = Task {
                id: data.next_id,
                title: title.to_string(),
                description: description.to_string(),
                assigned_to: assigned_to.to_string(),
                status: TaskStatus::Todo,
                priority: priority.to_string(),
                depends_on,
                created_at: Utc::now(),
                completed_at: None,
            };
            data.tasks.push(task.clone());
            data.next_id += 1;
            task
        })?;
        info!(task_id = task.id, title, assigned_to, "added task");
        Ok(task)
    }

    /// Highest-priority eligible todo task for an agent.
    ///
    /// A task with a `depends_on` pointer is eligible only when that
    /// dependency exists and is done; a dangling pointer does not gate.
    /// Ties keep insertion order (the sort is stable).
    pub fn get_next_task(&self, agent_name: &str) -> DomainResult<Option<Task>> {
        let data = self.doc.load()?;
        let mut candidates: Vec<&Task> = data
            .tasks
            .iter()
            .filter(|t| t.assigned_to == agent_name && t.status == TaskStatus::Todo)
            .filter(|t| match t.depends_on {
                Some(dep_id) => data
                    .tasks
                    .iter()
                    .find(|d| d.id == dep_id)
                    .is_none_or(|d| d.status == TaskStatus::Done),
                None => true,
            })
            .collect();
        candidates.sort_by_key(|t| t.rank());
        Ok(candidates.first().map(|t| (*t).clone()))
    }

    /// Set a task's status. Any transition is permitted; `done` stamps
    /// the completion time. An unknown id returns a message, not an
    /// error.
    pub fn update_status(&self, task_id: u64, status: TaskStatus) -> DomainResult<String> {
        self.doc.update(|data| {
            match data.tasks.iter_mut().find(|t| t.id == task_id) {
                Some(task) => {
                    task.status = status;
                    if status == TaskStatus::Done {
                        task.completed_at = Some(Utc::now());
                    }
                    format!("Task #{task_id} status -> {}", status.as_str())
                }
                None => format!("Task #{task_id} not found."),
            }
        })
    }

    /// Hand a task to a different agent and reopen it.
    pub fn reassign_task(&self, task_id: u64, new_agent: &str) -> DomainResult<String> {
        self.doc.update(|data| {
            match data.tasks.iter_mut().find(|t| t.id == task_id) {
                Some(task) => {
                    task.assigned_to = new_agent.to_string();
                    task.status = TaskStatus::Todo;
                    format!("Task #{task_id} reassigned to {new_agent}")
                }
                None => format!("Task #{task_id} not found."),
            }
        })
    }

    pub fn get_all_tasks(&self) -> DomainResult<Vec<Task>> {
        Ok(self.doc.load()?.tasks)
    }

    pub fn get_task(&self, task_id: u64) -> DomainResult<Option<Task>> {
        Ok(self.doc.load()?.tasks.into_iter().find(|t| t.id == task_id))
    }

    /// One-line status count summary.
    pub fn get_summary(&self) -> DomainResult<String> {
        let tasks = self.get_all_tasks()?;
        let total = tasks.len();
        let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
        let in_progress = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .count();
        let todo = tasks.iter().filter(|t| t.status == TaskStatus::Todo).count();
        Ok(format!(
            "Backlog: {total} total | {done} done | {in_progress} in progress | {todo} todo"
        ))
    }

    /// Whether any open (todo or in-progress) work remains.
    pub fn has_open_tasks(&self) -> DomainResult<bool> {
        Ok(self.get_all_tasks()?.iter().any(Task::is_open))
    }

    /// Open tasks assigned to agents that depend on the given task.
    pub fn dependents_of(&self, task_id: u64) -> DomainResult<Vec<Task>> {
        Ok(self
            .get_all_tasks()?
            .into_iter()
            .filter(|t| t.depends_on == Some(task_id) && t.is_open())
            .collect())
    }
}
