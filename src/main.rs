//! Foreman CLI entry point.

use clap::Parser;

use foreman::cli::{commands, BacklogAction, Cli, Commands, VoteAction};
use foreman::infrastructure::{logging, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err:#}");
            std::process::exit(1);
        }
    };

    // The guard flushes the file appender on drop; hold it for the
    // process lifetime.
    let _guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Logging setup error: {err:#}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run { cycles } => commands::run(config, cycles).await,
        Commands::Standup => commands::standup(config).await,
        Commands::Status => commands::status(config).await,
        Commands::Backlog { action } => match action {
            BacklogAction::List => commands::backlog_list(config).await,
            BacklogAction::Add {
                title,
                agent,
                priority,
                description,
                depends_on,
            } => commands::backlog_add(config, title, agent, priority, description, depends_on).await,
            BacklogAction::Done { id } => commands::backlog_done(config, id).await,
        },
        Commands::Plan => commands::plan(config).await,
        Commands::Vote { action } => match action {
            VoteAction::List => commands::vote_list(config).await,
            VoteAction::Propose {
                title,
                description,
                proposer,
                voters,
            } => commands::vote_propose(config, title, description, proposer, voters).await,
            VoteAction::Cast {
                id,
                agent,
                decision,
                reason,
            } => commands::vote_cast(config, id, agent, decision, reason).await,
            VoteAction::Tally { id } => commands::vote_tally(config, id).await,
        },
        Commands::Serve { port } => commands::serve(config, port).await,
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
