//! Workspace tools agents act through: file access, command execution,
//! and git operations.
//!
//! The command filter is a guard against accidental destructive commands
//! from a model reply, not a security boundary against a determined
//! adversary. Both checks always apply: the denylist rejects dangerous
//! substrings anywhere in the command, and the allowlist requires a
//! known program name at the front.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

/// Programs a command may start with.
const ALLOWED_PROGRAMS: &[&str] = &["python", "dir", "ls", "pip", "git"];

/// Substrings rejected anywhere in a command.
const DENIED_SUBSTRINGS: &[&str] = &[
    "rm -rf", "&&", "|", ";", "curl", "wget", "sudo", ">", "`", "$(",
];

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const GIT_STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const GIT_COMMIT_TIMEOUT: Duration = Duration::from_secs(10);
const GIT_PUSH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ToolBelt {
    workspace_dir: PathBuf,
    repo_dir: PathBuf,
}

/// Outcome of auto-running a Python file.
#[derive(Debug, Clone)]
pub struct PythonRun {
    pub success: bool,
    pub output: String,
}

fn truncated(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

impl ToolBelt {
    /// Creates the workspace directory if it is missing. The repo root is
    /// the workspace's parent; files agents drop there are still found.
    pub fn new(workspace_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let workspace_dir = workspace_dir.into();
        std::fs::create_dir_all(&workspace_dir)?;
        let repo_dir = workspace_dir
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self { workspace_dir, repo_dir })
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// Collapse any path to its basename inside the workspace. A request
    /// for `subdir/file.py` lands at `workspace/file.py`; directory
    /// traversal is impossible, subdirectories are flattened away.
    pub fn safe_path(&self, filename: &str) -> PathBuf {
        let basename = Path::new(filename)
            .file_name()
            .map_or_else(|| filename.to_string(), |n| n.to_string_lossy().into_owned());
        self.workspace_dir.join(basename)
    }

    /// Resolve a filename to an existing file: workspace first, then the
    /// repo root. `None` when neither has it.
    pub fn locate(&self, filename: &str) -> Option<PathBuf> {
        let path = self.safe_path(filename);
        if path.exists() {
            return Some(path);
        }
        let root = self.repo_dir.join(filename);
        root.exists().then_some(root)
    }

    /// Write a file in the workspace. Failures come back as messages so
    /// they can flow into an agent transcript.
    pub fn write_file(&self, filename: &str, content: &str) -> String {
        let path = self.safe_path(filename);
        match std::fs::write(&path, content) {
            Ok(()) => {
                info!(file = filename, "wrote workspace file");
                format!("Successfully wrote to {filename}")
            }
            Err(e) => format!("Error writing file: {e}"),
        }
    }

    pub fn read_file(&self, filename: &str) -> String {
        let path = self.safe_path(filename);
        if !path.exists() {
            return format!("Error: File {filename} does not exist");
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => format!("Error reading file: {e}"),
        }
    }

    /// Check a command against both filters. `None` means allowed.
    fn refuse_reason(command: &str) -> Option<String> {
        let trimmed = command.trim();
        if let Some(hit) = DENIED_SUBSTRINGS.iter().find(|s| trimmed.contains(*s)) {
            return Some(format!("Error: Command contains forbidden sequence '{hit}'."));
        }
        if !ALLOWED_PROGRAMS.iter().any(|p| trimmed.starts_with(p)) {
            return Some(
                "Error: Command not allowed. Only python, dir, ls, pip, git are permitted."
                    .to_string(),
            );
        }
        None
    }

    /// Run a filtered shell command in the workspace with a 30s timeout.
    /// Returns combined stdout and stderr.
    pub async fn run_command(&self, command: &str) -> String {
        if let Some(reason) = Self::refuse_reason(command) {
            warn!(command, "refused command");
            return reason;
        }
        self.shell(command, &self.workspace_dir, COMMAND_TIMEOUT)
            .await
    }

    pub async fn git_status(&self) -> String {
        self.shell("git status --short", &self.workspace_dir, GIT_STATUS_TIMEOUT)
            .await
    }

    pub async fn git_commit(&self, message: &str) -> String {
        // Single-quote the message; strip embedded quotes rather than
        // trying to escape them.
        let message = message.replace('\'', "");
        let add = self
            .shell("git add -A", &self.workspace_dir, GIT_COMMIT_TIMEOUT)
            .await;
        if add.starts_with("Error") {
            return add;
        }
        self.shell(
            &format!("git commit -m '{message}'"),
            &self.workspace_dir,
            GIT_COMMIT_TIMEOUT,
        )
        .await
    }

    pub async fn git_push(&self) -> String {
        self.shell("git push", &self.workspace_dir, GIT_PUSH_TIMEOUT)
            .await
    }

    /// Run a freshly written Python file with a typed pass/fail outcome,
    /// so the caller never has to sniff the output for error words.
    pub async fn run_python(&self, filename: &str) -> PythonRun {
        let Some(path) = self.locate(filename) else {
            return PythonRun {
                success: false,
                output: format!("Error: File {filename} does not exist"),
            };
        };

        let child = Command::new("python").arg(&path).current_dir(&self.workspace_dir).output();
        match tokio::time::timeout(COMMAND_TIMEOUT, child).await {
            Err(_) => PythonRun {
                success: false,
                output: format!("{filename} timed out after 30s"),
            },
            Ok(Err(e)) => PythonRun {
                success: false,
                output: format!("Error running {filename}: {e}"),
            },
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if output.status.success() {
                    PythonRun {
                        success: true,
                        output: format!("{filename} OK: {}", truncated(&stdout, 200)),
                    }
                } else {
                    PythonRun {
                        success: false,
                        output: format!(
                            "{filename} FAILED (exit {}):\n{}",
                            output.status.code().unwrap_or(-1),
                            truncated(&stderr, 1000)
                        ),
                    }
                }
            }
        }
    }

    async fn shell(&self, command: &str, cwd: &Path, timeout: Duration) -> String {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .output();

        match tokio::time::timeout(timeout, child).await {
            Err(_) => "Error: Command timed out.".to_string(),
            Ok(Err(e)) => format!("Error running command: {e}"),
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    text.push_str(&format!("\nErrors:\n{stderr}"));
                }
                if text.trim().is_empty() {
                    "Command executed with no output.".to_string()
                } else {
                    text
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn belt(dir: &TempDir) -> ToolBelt {
        ToolBelt::new(dir.path().join("workspace")).unwrap()
    }

    #[test]
    fn test_safe_path_collapses_to_basename() {
        let dir = TempDir::new().unwrap();
        let tools = belt(&dir);
        let path = tools.safe_path("../../etc/passwd");
        assert_eq!(path, tools.workspace_dir().join("passwd"));

        let path = tools.safe_path("subdir/model.py");
        assert_eq!(path, tools.workspace_dir().join("model.py"));
    }

    #[test]
    fn test_locate_falls_back_to_repo_root() {
        let dir = TempDir::new().unwrap();
        let tools = belt(&dir);

        assert!(tools.locate("analysis.py").is_none());

        // A file only at the repo root still resolves.
        std::fs::write(dir.path().join("analysis.py"), "print()").unwrap();
        assert_eq!(
            tools.locate("analysis.py"),
            Some(dir.path().join("analysis.py"))
        );

        // The workspace copy wins when both exist.
        tools.write_file("analysis.py", "print(1)");
        assert_eq!(
            tools.locate("analysis.py"),
            Some(tools.workspace_dir().join("analysis.py"))
        );
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let tools = belt(&dir);
        assert_eq!(
            tools.write_file("notes.txt", "hello"),
            "Successfully wrote to notes.txt"
        );
        assert_eq!(tools.read_file("notes.txt"), "hello");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let tools = belt(&dir);
        assert_eq!(
            tools.read_file("ghost.py"),
            "Error: File ghost.py does not exist"
        );
    }

    #[tokio::test]
    async fn test_blocklist_beats_allowlist() {
        let dir = TempDir::new().unwrap();
        let tools = belt(&dir);
        // curl is not an allowed program, but the blocklist must be the
        // check that fires.
        let result = tools.run_command("curl http://evil").await;
        assert!(result.contains("forbidden sequence 'curl'"), "{result}");

        let result = tools.run_command("python foo.py && rm -rf /").await;
        assert!(result.contains("forbidden sequence '&&'"), "{result}");
    }

    #[tokio::test]
    async fn test_unknown_program_rejected() {
        let dir = TempDir::new().unwrap();
        let tools = belt(&dir);
        let result = tools.run_command("cargo build").await;
        assert!(result.starts_with("Error: Command not allowed"), "{result}");
    }

    #[tokio::test]
    async fn test_allowed_command_runs() {
        let dir = TempDir::new().unwrap();
        let tools = belt(&dir);
        tools.write_file("a.txt", "x");
        let result = tools.run_command("ls").await;
        assert!(result.contains("a.txt"), "{result}");
    }

    #[tokio::test]
    async fn test_command_with_no_output() {
        let dir = TempDir::new().unwrap();
        let tools = belt(&dir);
        let result = tools.run_command("python -c pass").await;
        // Either ran cleanly with no output, or python is missing and
        // the error text says so; both prove the filter let it through.
        assert!(
            result == "Command executed with no output." || result.contains("Errors:"),
            "{result}"
        );
    }
}
