//! Agent runtime: the think / act / auto-run / validate retry loop.
//!
//! Every role runs the same loop; only the role instructions differ.
//! Chat failures are typed (`ChatError`), tool failures are collected
//! per command rather than sniffed out of a joined transcript.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::store::{AgentMemory, SharedMemory};
use crate::domain::models::{AgentRole, AgentState, AgentStatus, ChatMessage, ToolCommand};
use crate::domain::ports::{ChatClient, ChatError};
use crate::services::command_parser::{
    mentioned_filenames, parse_commands, written_python_files, ParsedCommand,
};
use crate::services::session_registry::session_id;
use crate::services::tool_belt::ToolBelt;

const HISTORY_CAP: usize = 10;

/// Tool documentation injected into every system prompt. The grammar
/// here is the only one the parser accepts.
const TOOL_USAGE: &str = r#"You have access to the following TOOLS to perform actions.
To use a tool you MUST use this exact format:
[JSON_CMD: {"tool": "TOOL_NAME", "args": {"key": "value"}}]

Available Tools:
1. WRITE_FILE: Create or overwrite a file.
   Usage:
   [WRITE_FILE: filename.py]
   def hello():
       print("World")
   [END_WRITE_FILE]
   Provide ONLY the code block when writing files. No conversational filler.
2. READ_FILE: Read a file's content.
   Usage: [JSON_CMD: {"tool": "READ_FILE", "args": {"target": "filename.py"}}]
3. EXECUTE: Run a terminal command (python, ls, pip, git).
   Usage: [JSON_CMD: {"tool": "EXECUTE", "args": {"target": "python filename.py"}}]
4. LEARN: Store knowledge in long-term memory.
   Usage: [JSON_CMD: {"tool": "LEARN", "args": {"key": "concept_name", "value": "description"}}]
5. RECALL: Retrieve knowledge from long-term memory.
   Usage: [JSON_CMD: {"tool": "RECALL", "args": {"key": "concept_name"}}]
6. GIT_COMMIT: Stage and commit all changes.
   Usage: [JSON_CMD: {"tool": "GIT_COMMIT", "args": {"message": "commit message"}}]
7. GIT_PUSH: Push commits to the remote.
   Usage: [JSON_CMD: {"tool": "GIT_PUSH", "args": {}}]
8. GIT_STATUS: Check current git status.
   Usage: [JSON_CMD: {"tool": "GIT_STATUS", "args": {}}]

When assigned a task to learn or remember something, use the LEARN tool
immediately. When asked to recall something, use the RECALL tool. After
completing significant work, use GIT_COMMIT to save your changes."#;

/// Result of one task attempt through the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatusKind {
    Success,
    Partial,
}

#[derive(Debug, Clone)]
pub struct TaskReport {
    pub status: TaskStatusKind,
    pub output: String,
    pub error: Option<String>,
    pub rounds: u32,
}

impl TaskReport {
    pub fn is_success(&self) -> bool {
        self.status == TaskStatusKind::Success
    }
}

/// What one Act pass did: the transcript for the next prompt, plus the
/// subset of lines that were failures.
#[derive(Debug, Default)]
pub struct ActionReport {
    pub transcript: String,
    pub errors: Vec<String>,
}

impl ActionReport {
    fn push(&mut self, line: String, failed: bool) {
        if failed {
            self.errors.push(line.clone());
        }
        if !self.transcript.is_empty() {
            self.transcript.push('\n');
        }
        self.transcript.push_str(&line);
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }
}

fn is_tool_error(result: &str) -> bool {
    result.starts_with("Error") || result.contains("\nErrors:\n")
}

fn clip(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub struct Agent {
    pub role: AgentRole,
    pub status: AgentStatus,
    name: &'static str,
    session: String,
    chat: Arc<dyn ChatClient>,
    tools: Arc<ToolBelt>,
    memory: AgentMemory,
    shared: Arc<SharedMemory>,
    temperature: f32,
    project_context: String,
    history: VecDeque<String>,
}

impl Agent {
    pub fn new(
        role: AgentRole,
        chat: Arc<dyn ChatClient>,
        tools: Arc<ToolBelt>,
        shared: Arc<SharedMemory>,
        memory: AgentMemory,
        temperature: f32,
        project_context: impl Into<String>,
    ) -> Self {
        Self {
            role,
            status: AgentStatus::default(),
            name: role.name(),
            session: session_id(role.name()),
            chat,
            tools,
            memory,
            shared,
            temperature,
            project_context: project_context.into(),
            history: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    pub fn startup(&mut self) {
        self.status.state = AgentState::Idle;
        self.status.record_activity("started");
        info!(agent = self.name, session = %self.session, "agent started");
    }

    pub fn shutdown(&mut self) {
        self.status.state = AgentState::ShutDown;
        info!(agent = self.name, "agent shut down");
    }

    /// A message from another agent, kept in a short ring for context.
    pub fn receive_message(&mut self, from: &str, message: &str) {
        self.history.push_back(format!("{from}: {message}"));
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
    }

    fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are the {} of an automated trading research team. \
             Be detailed, professional, and proactive. Respond as a real \
             expert in your field.\n\nYOUR ROLE INSTRUCTIONS:\n{}",
            self.role.display_name(),
            self.role.instructions()
        );
        if !self.project_context.is_empty() {
            prompt.push_str(&format!("\n\nPROJECT CONTEXT:\n{}", self.project_context));
        }
        match self.shared.context_for_agent(self.name) {
            Ok(shared) if !shared.is_empty() => {
                prompt.push_str(&format!(
                    "\n\nSHARED KNOWLEDGE FROM OTHER AGENTS:\n{shared}"
                ));
            }
            Ok(_) => {}
            Err(e) => warn!(agent = self.name, error = %e, "shared memory unavailable"),
        }
        prompt.push_str("\n\n");
        prompt.push_str(TOOL_USAGE);
        prompt
    }

    /// Ask the model for the next move given `context` and the task text.
    pub async fn think(&mut self, context: &str, task: &str) -> Result<String, ChatError> {
        let mut user = format!(
            "Here is the context: {context}\n\nTask/Question: {task}\n\nProvide a professional response."
        );
        if !self.history.is_empty() {
            let recent: Vec<&str> = self.history.iter().map(String::as_str).collect();
            user.push_str(&format!("\n\nRECENT MESSAGES:\n{}", recent.join("\n")));
        }
        let messages = [
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(user),
        ];
        self.status.state = AgentState::Working;
        self.status.record_activity(clip(task, 80).to_string());
        let reply = self.chat.chat(&messages, self.temperature).await?;
        Ok(reply.content)
    }

    /// Parse and execute every command in a reply.
    pub async fn act(&self, thought: &str) -> ActionReport {
        let mut report = ActionReport::default();
        for parsed in parse_commands(thought) {
            match parsed {
                ParsedCommand::Malformed(msg) => report.push(msg, true),
                ParsedCommand::Command(command) => {
                    let name = command.name();
                    let result = self.dispatch(command).await;
                    let failed = is_tool_error(&result);
                    report.push(format!("{name}: {result}"), failed);
                }
            }
        }
        report
    }

    async fn dispatch(&self, command: ToolCommand) -> String {
        match command {
            ToolCommand::WriteFile { filename, content } => {
                self.tools.write_file(&filename, &content)
            }
            ToolCommand::ReadFile { filename } => self.tools.read_file(&filename),
            ToolCommand::Execute { command } => self.tools.run_command(&command).await,
            ToolCommand::Learn { key, value } => self
                .memory
                .remember_fact(&key, &value)
                .unwrap_or_else(|e| format!("Error storing fact: {e}")),
            ToolCommand::Recall { key: Some(key) } => self
                .memory
                .recall_fact(&key)
                .unwrap_or_else(|e| format!("Error recalling fact: {e}")),
            ToolCommand::Recall { key: None } => self
                .memory
                .all_facts()
                .unwrap_or_else(|e| format!("Error recalling facts: {e}")),
            ToolCommand::GitCommit { message } => self.tools.git_commit(&message).await,
            ToolCommand::GitPush => self.tools.git_push().await,
            ToolCommand::GitStatus => self.tools.git_status().await,
        }
    }

    /// Execute every Python file the Act pass wrote. `None` when nothing
    /// was written.
    async fn auto_run(&self, action_transcript: &str) -> Option<(String, bool)> {
        let files = written_python_files(action_transcript);
        if files.is_empty() {
            return None;
        }
        let mut lines = Vec::new();
        let mut all_ok = true;
        for filename in files {
            info!(agent = self.name, file = %filename, "auto-running");
            let run = self.tools.run_python(&filename).await;
            all_ok &= run.success;
            lines.push(run.output);
        }
        Some((lines.join("\n"), all_ok))
    }

    /// Every filename-shaped token in the thought is a promised file
    /// that must exist in the workspace or at the repo root.
    fn validate_output(&self, thought: &str) -> Result<(), String> {
        let missing: Vec<String> = mentioned_filenames(thought)
            .into_iter()
            .filter(|f| self.tools.locate(f).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("Expected files not found: {}", missing.join(", ")))
        }
    }

    /// The bounded retry loop. Always returns within `max_rounds` think
    /// cycles and never panics on a tool failure.
    pub async fn execute_with_retry(&mut self, task_description: &str, max_rounds: u32) -> TaskReport {
        let mut last_error: Option<String> = None;
        let mut outputs: Vec<String> = Vec::new();

        // Past failures on similar tasks, matched by leading keywords.
        let mut failure_context = String::new();
        for keyword in task_description.split_whitespace().take(3) {
            match self.memory.failure_history(keyword) {
                Ok(history) if !history.is_empty() => {
                    failure_context = format!("\n\n{history}");
                    break;
                }
                Ok(_) => {}
                Err(e) => warn!(agent = self.name, error = %e, "failure history unavailable"),
            }
        }

        for round in 1..=max_rounds {
            info!(
                agent = self.name,
                round,
                max_rounds,
                task = clip(task_description, 60),
                "retry round"
            );

            let mut context = format!("{task_description}{failure_context}");
            if let Some(error) = &last_error {
                context.push_str(&format!(
                    "\n\nPREVIOUS ATTEMPT FAILED with error:\n{error}\nPlease fix the issue and try again."
                ));
            }

            let thought = match self.think(&context, task_description).await {
                Ok(thought) => thought,
                Err(e) => {
                    last_error = Some(format!("Thinking failed: {e}"));
                    self.status.record_error(e.to_string());
                    continue;
                }
            };

            let action = self.act(&thought).await;
            if !action.is_empty() {
                outputs.push(action.transcript.clone());
            }
            if !action.errors.is_empty() {
                last_error = Some(action.errors.join("\n"));
                warn!(agent = self.name, round, "action errors, retrying");
                continue;
            }

            if let Some((run_output, ok)) = self.auto_run(&action.transcript).await {
                outputs.push(run_output.clone());
                if !ok {
                    last_error = Some(format!("Code execution failed:\n{run_output}"));
                    warn!(agent = self.name, round, "code run failed, retrying");
                    continue;
                }
            }

            match self.validate_output(&thought) {
                Ok(()) => {
                    self.status.state = AgentState::Idle;
                    let output = if outputs.is_empty() {
                        clip(&thought, 500).to_string()
                    } else {
                        outputs.join("\n")
                    };
                    return TaskReport {
                        status: TaskStatusKind::Success,
                        output,
                        error: None,
                        rounds: round,
                    };
                }
                Err(reason) => {
                    warn!(agent = self.name, round, reason, "validation failed");
                    last_error = Some(reason);
                }
            }
        }

        if let Some(error) = &last_error {
            if let Err(e) = self.memory.record_failure(
                clip(task_description, 100),
                clip(error, 300),
                max_rounds,
            ) {
                warn!(agent = self.name, error = %e, "failed to record failure");
            }
        }
        self.status.state = AgentState::Error;
        TaskReport {
            status: TaskStatusKind::Partial,
            output: if outputs.is_empty() {
                format!("Completed with issues after {max_rounds} rounds")
            } else {
                outputs.join("\n")
            },
            error: last_error,
            rounds: max_rounds,
        }
    }

    /// Free-text standup status; logged by the orchestrator, not parsed.
    pub async fn standup_report(&mut self) -> Result<String, ChatError> {
        self.think(
            "Daily standup meeting.",
            "Give a brief status report: what you are ready to work on today and any blockers.",
        )
        .await
    }

    /// Ask the model to review a workspace file. A missing file is a
    /// reviewable condition, not a transport failure.
    pub async fn review_code(&mut self, filename: &str) -> Result<String, ChatError> {
        let code = self.tools.read_file(filename);
        if is_tool_error(&code) {
            return Ok(format!("Cannot review {filename}: {code}"));
        }
        let messages = [
            ChatMessage::system(
                "You are a senior code reviewer for a trading research team.\n\
                 Review the code and provide:\n\
                 1. QUALITY SCORE (1-10)\n\
                 2. BUGS or ISSUES found\n\
                 3. SUGGESTIONS for improvement\n\
                 4. SECURITY concerns\n\
                 Be concise.",
            ),
            ChatMessage::user(format!(
                "Review this file ({filename}):\n```python\n{}\n```",
                clip(&code, 3000)
            )),
        ];
        let reply = self.chat.chat(&messages, self.temperature).await?;
        info!(agent = self.name, file = filename, "code review completed");
        Ok(reply.content)
    }
}
