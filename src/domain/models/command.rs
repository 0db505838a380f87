//! Tool commands an agent can issue from a model reply.
//!
//! The wire grammar (WRITE_FILE blocks and JSON_CMD envelopes) lives in
//! `services::command_parser`; this is the parsed form.

use serde::{Deserialize, Serialize};

/// A single parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolCommand {
    WriteFile { filename: String, content: String },
    ReadFile { filename: String },
    Execute { command: String },
    Learn { key: String, value: String },
    Recall { key: Option<String> },
    GitCommit { message: String },
    GitPush,
    GitStatus,
}

impl ToolCommand {
    /// Command name as it appears in the wire grammar.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WriteFile { .. } => "WRITE_FILE",
            Self::ReadFile { .. } => "READ_FILE",
            Self::Execute { .. } => "EXECUTE",
            Self::Learn { .. } => "LEARN",
            Self::Recall { .. } => "RECALL",
            Self::GitCommit { .. } => "GIT_COMMIT",
            Self::GitPush => "GIT_PUSH",
            Self::GitStatus => "GIT_STATUS",
        }
    }
}
