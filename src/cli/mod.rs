//! Command-line interface for the foreman orchestrator.

pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "foreman", about = "Multi-agent trading research orchestrator", version)]
pub struct Cli {
    /// Load configuration from a specific file instead of the default
    /// `.foreman/config.yaml` chain.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run pipeline cycles (forever unless --cycles is given)
    Run {
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Hold a single standup and print each agent's report
    Standup,
    /// Show backlog, voting, and agent health summaries
    Status,
    /// Inspect or edit the task backlog
    Backlog {
        #[command(subcommand)]
        action: BacklogAction,
    },
    /// Ask the planner for follow-up tasks and add them to the backlog
    Plan,
    /// Propose, cast, and tally team votes
    Vote {
        #[command(subcommand)]
        action: VoteAction,
    },
    /// Serve the read-only HTTP status API
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
pub enum BacklogAction {
    /// List all tasks
    List,
    /// Add a task
    Add {
        title: String,
        #[arg(long, default_value = "engineer")]
        agent: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        depends_on: Option<u64>,
    },
    /// Mark a task done
    Done { id: u64 },
}

#[derive(Subcommand)]
pub enum VoteAction {
    /// List open proposals
    List,
    /// Open a proposal (voters default to the standing quorum)
    Propose {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "risk_manager")]
        proposer: String,
        /// Registered voters; repeat the flag per agent
        #[arg(long = "voter")]
        voters: Vec<String>,
    },
    /// Cast a vote on a proposal
    Cast {
        id: u64,
        agent: String,
        /// approve or reject
        decision: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Show the current tally for a proposal
    Tally { id: u64 },
}
