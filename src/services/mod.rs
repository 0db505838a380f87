//! Stateless domain services: reply parsing, routing, scheduling helpers.

pub mod command_parser;
pub mod dependency_graph;
pub mod model_router;
pub mod session_registry;
pub mod tool_belt;

pub use command_parser::{
    mentioned_filenames, parse_commands, written_python_files, ParsedCommand,
};
pub use dependency_graph::{detect_cycle, diagnose_stall};
pub use model_router::{ModelRouter, ModelSelection};
pub use session_registry::session_id;
pub use tool_belt::{PythonRun, ToolBelt};
