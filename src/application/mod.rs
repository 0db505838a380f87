//! Application layer: the agent runtime and the Project Manager that
//! drives it.

pub mod agent;
pub mod orchestrator;
pub mod planner;
pub mod reporter;

pub use agent::{Agent, TaskReport, TaskStatusKind};
pub use orchestrator::ProjectManager;
pub use planner::{EscalationDecision, Planner};
pub use reporter::DailyReporter;
