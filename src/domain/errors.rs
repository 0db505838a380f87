//! Domain errors for the Foreman orchestration system.

use thiserror::Error;

/// Format a dependency cycle as a human-readable string: `1 -> 2 -> 1`.
fn format_cycle_path(path: &[u64]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Domain-level errors that can occur in the Foreman system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Task not found: #{0}")]
    TaskNotFound(u64),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Proposal not found: #{0}")]
    ProposalNotFound(u64),

    #[error("Task dependency cycle detected: {}", format_cycle_path(.0))]
    DependencyCycle(Vec<u64>),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
