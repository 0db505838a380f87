//! The command grammar agents speak.
//!
//! Two forms, both extracted from free-text model replies:
//!
//! ```text
//! [WRITE_FILE: filename.py]
//! ...file content...
//! [END_WRITE_FILE]
//!
//! [JSON_CMD: {"tool": "READ_FILE", "args": {"target": "filename.py"}}]
//! ```
//!
//! This is the whole protocol. A malformed JSON_CMD yields a parse-error
//! entry rather than being silently dropped, so the failure text reaches
//! the agent's next round.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::models::ToolCommand;

static WRITE_FILE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[WRITE_FILE:\s*(.*?)\](.*?)\[END_WRITE_FILE\]").expect("valid regex")
});

static JSON_CMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[JSON_CMD:\s*(\{.*?\})\s*\]").expect("valid regex"));

/// Filenames mentioned in a reply, for output validation.
static FILENAME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w_]+\.(?:py|csv|json|txt|yaml|md)").expect("valid regex"));

/// Python files reported as written, for auto-run.
static WRITTEN_PY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"WRITE_FILE.*?(?:workspace[/\\])?(\w+\.py)").expect("valid regex")
});

/// One extraction from a reply: a command or a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Command(ToolCommand),
    /// A JSON_CMD envelope that did not parse; carries the error text.
    Malformed(String),
}

#[derive(Deserialize)]
struct JsonEnvelope {
    tool: String,
    #[serde(default)]
    args: serde_json::Map<String, Value>,
}

fn arg<'a>(args: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| args.get(*k).and_then(Value::as_str))
}

fn envelope_to_command(envelope: &JsonEnvelope) -> Result<ToolCommand, String> {
    let args = &envelope.args;
    match envelope.tool.to_uppercase().as_str() {
        "WRITE_FILE" => {
            let filename = arg(args, &["target", "filename"]);
            let content = arg(args, &["content"]);
            match (filename, content) {
                (Some(filename), Some(content)) => Ok(ToolCommand::WriteFile {
                    filename: filename.to_string(),
                    content: content.to_string(),
                }),
                _ => Err("Missing target or content.".to_string()),
            }
        }
        "READ_FILE" => arg(args, &["target", "filename"])
            .map(|filename| ToolCommand::ReadFile {
                filename: filename.to_string(),
            })
            .ok_or_else(|| "Missing target.".to_string()),
        "EXECUTE" | "RUN" => arg(args, &["target", "command"])
            .map(|command| ToolCommand::Execute {
                command: command.to_string(),
            })
            .ok_or_else(|| "Missing command.".to_string()),
        "LEARN" => {
            let key = arg(args, &["key"]);
            let value = arg(args, &["value"]);
            match (key, value) {
                (Some(key), Some(value)) => Ok(ToolCommand::Learn {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
                _ => Err("Missing key/value.".to_string()),
            }
        }
        "RECALL" => Ok(ToolCommand::Recall {
            key: arg(args, &["key"]).map(ToString::to_string),
        }),
        "GIT_COMMIT" => Ok(ToolCommand::GitCommit {
            message: arg(args, &["message"])
                .unwrap_or("Auto-commit by agent")
                .to_string(),
        }),
        "GIT_PUSH" => Ok(ToolCommand::GitPush),
        "GIT_STATUS" => Ok(ToolCommand::GitStatus),
        other => Err(format!("Unknown command {other}")),
    }
}

/// Extract every command from a model reply, in order of appearance:
/// WRITE_FILE blocks first, then JSON_CMD envelopes.
pub fn parse_commands(reply: &str) -> Vec<ParsedCommand> {
    let mut commands = Vec::new();

    for captures in WRITE_FILE_BLOCK.captures_iter(reply) {
        let filename = captures[1].trim().to_string();
        let content = captures[2].trim().to_string();
        commands.push(ParsedCommand::Command(ToolCommand::WriteFile {
            filename,
            content,
        }));
    }

    for captures in JSON_CMD.captures_iter(reply) {
        let json_str = &captures[1];
        match serde_json::from_str::<JsonEnvelope>(json_str) {
            Ok(envelope) => match envelope_to_command(&envelope) {
                Ok(command) => commands.push(ParsedCommand::Command(command)),
                Err(reason) => commands.push(ParsedCommand::Malformed(format!(
                    "Error in {}: {reason}",
                    envelope.tool
                ))),
            },
            Err(e) => commands.push(ParsedCommand::Malformed(format!(
                "Error parsing JSON_CMD: {e}"
            ))),
        }
    }

    commands
}

/// Filenames a reply claims to produce; deduplicated, order preserved.
pub fn mentioned_filenames(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in FILENAME_TOKEN.find_iter(text) {
        let name = m.as_str().to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Python files named in WRITE_FILE action results, for auto-run.
pub fn written_python_files(action_result: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for captures in WRITTEN_PY.captures_iter(action_result) {
        let name = captures[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_file_block() {
        let reply = "Here is the script:\n[WRITE_FILE: hello.py]\nprint('hi')\n[END_WRITE_FILE]\nDone.";
        let commands = parse_commands(reply);
        assert_eq!(
            commands,
            vec![ParsedCommand::Command(ToolCommand::WriteFile {
                filename: "hello.py".to_string(),
                content: "print('hi')".to_string(),
            })]
        );
    }

    #[test]
    fn test_multiple_write_blocks() {
        let reply = "[WRITE_FILE: a.py]\n1\n[END_WRITE_FILE]\n[WRITE_FILE: b.py]\n2\n[END_WRITE_FILE]";
        assert_eq!(parse_commands(reply).len(), 2);
    }

    #[test]
    fn test_json_cmd_with_target_alias() {
        let reply = r#"[JSON_CMD: {"tool": "READ_FILE", "args": {"target": "data.csv"}}]"#;
        assert_eq!(
            parse_commands(reply),
            vec![ParsedCommand::Command(ToolCommand::ReadFile {
                filename: "data.csv".to_string(),
            })]
        );
    }

    #[test]
    fn test_json_cmd_execute() {
        let reply = r#"Run it: [JSON_CMD: {"tool": "EXECUTE", "args": {"target": "python hello.py"}}]"#;
        assert_eq!(
            parse_commands(reply),
            vec![ParsedCommand::Command(ToolCommand::Execute {
                command: "python hello.py".to_string(),
            })]
        );
    }

    #[test]
    fn test_json_cmd_learn_and_recall() {
        let reply = r#"
            [JSON_CMD: {"tool": "LEARN", "args": {"key": "sma", "value": "20-period"}}]
            [JSON_CMD: {"tool": "RECALL", "args": {}}]
        "#;
        let commands = parse_commands(reply);
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[1],
            ParsedCommand::Command(ToolCommand::Recall { key: None })
        );
    }

    #[test]
    fn test_git_commit_default_message() {
        let reply = r#"[JSON_CMD: {"tool": "GIT_COMMIT", "args": {}}]"#;
        assert_eq!(
            parse_commands(reply),
            vec![ParsedCommand::Command(ToolCommand::GitCommit {
                message: "Auto-commit by agent".to_string(),
            })]
        );
    }

    #[test]
    fn test_malformed_json_reported() {
        let reply = "[JSON_CMD: {broken json}]";
        let commands = parse_commands(reply);
        assert_eq!(commands.len(), 1);
        assert!(matches!(&commands[0], ParsedCommand::Malformed(msg) if msg.contains("parsing")));
    }

    #[test]
    fn test_unknown_tool_reported() {
        let reply = r#"[JSON_CMD: {"tool": "DELETE_EVERYTHING", "args": {}}]"#;
        let commands = parse_commands(reply);
        assert!(matches!(
            &commands[0],
            ParsedCommand::Malformed(msg) if msg.contains("Unknown command DELETE_EVERYTHING")
        ));
    }

    #[test]
    fn test_plain_text_yields_nothing() {
        assert!(parse_commands("I think we should wait for more data.").is_empty());
    }

    #[test]
    fn test_mentioned_filenames_dedup() {
        let text = "I wrote model.py and data.csv, then ran model.py";
        assert_eq!(mentioned_filenames(text), vec!["model.py", "data.csv"]);
    }

    #[test]
    fn test_written_python_files() {
        let result = "BLOCK_CMD WRITE_FILE: Successfully wrote to train.py";
        assert_eq!(written_python_files(result), vec!["train.py"]);
    }
}
