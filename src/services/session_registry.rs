//! Canonical session identifiers for every agent.
//!
//! A single map so concurrent components never mint divergent ids for
//! the same agent. Unknown names fall back to a derived id.

pub const MAIN_SESSION: &str = "agent:main:main";

const KNOWN_SESSIONS: &[(&str, &str)] = &[
    (
        "project_manager",
        "agent:main:subagent:12b2e050-8ff9-4f2a-af19-5f362ae546fb",
    ),
    (
        "data_scientist",
        "agent:main:subagent:6a1a837e-d912-4889-abd8-3127c8f4d42a",
    ),
    (
        "quant_analyst",
        "agent:main:subagent:003e337a-e6fe-4035-b8e5-0d754a447f6c",
    ),
    (
        "engineer",
        "agent:main:subagent:875988ba-7250-4c5b-883b-7b226735e4e0",
    ),
    (
        "devops",
        "agent:main:subagent:9bd475bd-9f19-4bff-83b7-b1ee2ab962be",
    ),
    (
        "trading_assistant",
        "agent:main:subagent:88c8ab35-081f-4567-8f12-cd92dafaa755",
    ),
    ("main_system", MAIN_SESSION),
];

/// Session id for an agent name.
pub fn session_id(agent_name: &str) -> String {
    KNOWN_SESSIONS
        .iter()
        .find(|(name, _)| *name == agent_name)
        .map(|(_, id)| (*id).to_string())
        .unwrap_or_else(|| format!("agent:main:{agent_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_agent_gets_fixed_id() {
        assert_eq!(
            session_id("project_manager"),
            "agent:main:subagent:12b2e050-8ff9-4f2a-af19-5f362ae546fb"
        );
        assert_eq!(session_id("main_system"), MAIN_SESSION);
    }

    #[test]
    fn test_unknown_agent_gets_derived_id() {
        assert_eq!(session_id("intern"), "agent:main:intern");
    }

    #[test]
    fn test_same_name_same_id() {
        assert_eq!(session_id("engineer"), session_id("engineer"));
    }
}
