//! CLI command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, ContentArrangement, Table};
use console::style;
use tracing::info;

use crate::adapters::http::{serve as serve_api, StatusAppState};
use crate::adapters::llm::{DeepSeekClient, SlidingWindowLimiter};
use crate::adapters::store::{BacklogManager, HealthMonitor, Leaderboard, PaperTrader, VoteStore};
use crate::adapters::telegram::TelegramNotifier;
use crate::application::{Planner, ProjectManager};
use crate::domain::models::{Config, Task};
use crate::domain::ports::{ChatClient, RandomWalkFeed};
use crate::infrastructure::env_or_dotenv;

fn build_chat(config: &Config) -> Result<Arc<dyn ChatClient>> {
    let limiter = SlidingWindowLimiter::new(
        config.rate_limit.calls_per_minute,
        config.rate_limit.tokens_per_minute,
    );
    let api_key = env_or_dotenv("DEEPSEEK_API_KEY").unwrap_or_default();
    let client = DeepSeekClient::new(config.llm.clone(), api_key, limiter)
        .context("Failed to build the DeepSeek client")?;
    Ok(Arc::new(client))
}

fn data_path(config: &Config, file: &str) -> PathBuf {
    PathBuf::from(&config.data_dir).join(file)
}

pub async fn run(config: Config, cycles: Option<u32>) -> Result<()> {
    let chat = build_chat(&config)?;
    let mut pm = ProjectManager::new(config, chat)?;

    let mut interrupted = false;
    tokio::select! {
        _ = pm.run(cycles) => {}
        _ = tokio::signal::ctrl_c() => { interrupted = true; }
    }
    if interrupted {
        info!("interrupt received, shutting down");
        pm.finish().await;
    }
    Ok(())
}

pub async fn standup(config: Config) -> Result<()> {
    let chat = build_chat(&config)?;
    let mut pm = ProjectManager::new(config, chat)?;
    let reports = pm.standup().await?;
    for (agent, report) in reports {
        println!("{}", style(format!("=== {agent} ===")).bold().cyan());
        println!("{report}\n");
    }
    Ok(())
}

pub async fn status(config: Config) -> Result<()> {
    let backlog = BacklogManager::new(data_path(&config, "backlog.json"));
    let votes = VoteStore::new(data_path(&config, "votes.json"));
    let health = HealthMonitor::new(data_path(&config, "agent_health.json"));
    let leaderboard = Leaderboard::new(data_path(&config, "leaderboard.json"));

    println!("{}", style("Backlog").bold());
    println!("{}", backlog.get_summary()?);
    println!("\n{}", style("Voting").bold());
    println!("{}", votes.get_summary()?);
    println!("\n{}", style("Agent health").bold());
    println!("{}", health.summary_text()?);
    println!("\n{}", style("Strategies").bold());
    println!("{}", leaderboard.leaderboard_text()?);

    let trader = PaperTrader::new(
        data_path(&config, "paper_trading.json"),
        Arc::new(RandomWalkFeed::new(1.085)),
        config.trading.initial_capital,
    );
    println!("\n{}", style("Paper trading").bold());
    println!("{}", trader.summary_text()?);
    Ok(())
}

pub async fn backlog_list(config: Config) -> Result<()> {
    let backlog = BacklogManager::new(data_path(&config, "backlog.json"));
    let tasks = backlog.get_all_tasks()?;
    if tasks.is_empty() {
        println!("Backlog is empty.");
        return Ok(());
    }
    println!("{}", task_table(&tasks));
    println!("{}", backlog.get_summary()?);
    Ok(())
}

pub async fn backlog_add(
    config: Config,
    title: String,
    agent: String,
    priority: String,
    description: String,
    depends_on: Option<u64>,
) -> Result<()> {
    let backlog = BacklogManager::new(data_path(&config, "backlog.json"));
    let task = backlog.add_task(&title, &agent, &priority, &description, depends_on)?;
    println!("Added task #{}: {} ({} / {})", task.id, task.title, task.assigned_to, task.priority);
    Ok(())
}

pub async fn backlog_done(config: Config, id: u64) -> Result<()> {
    let backlog = BacklogManager::new(data_path(&config, "backlog.json"));
    let message = backlog.update_status(id, crate::domain::models::TaskStatus::Done)?;
    println!("{message}");
    Ok(())
}

/// One-shot planning pass: propose follow-up tasks from the completed
/// titles and the workspace listing, then add them to the backlog.
pub async fn plan(config: Config) -> Result<()> {
    let chat = build_chat(&config)?;
    let backlog = BacklogManager::new(data_path(&config, "backlog.json"));
    let completed: Vec<String> = backlog
        .get_all_tasks()?
        .into_iter()
        .filter(|t| t.status == crate::domain::models::TaskStatus::Done)
        .map(|t| t.title)
        .collect();

    let workspace: Vec<String> = std::fs::read_dir(&config.workspace_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    let planner = Planner::new(chat, config.llm.temperature);
    let planned = planner.propose_tasks(&completed, &workspace).await;
    for p in planned {
        let task = backlog.add_task(&p.title, &p.assigned_to, &p.priority, &p.description, None)?;
        println!("Added task #{}: {} ({})", task.id, task.title, task.assigned_to);
    }
    Ok(())
}

pub async fn vote_list(config: Config) -> Result<()> {
    let votes = VoteStore::new(data_path(&config, "votes.json"));
    let open = votes.get_open_proposals()?;
    if open.is_empty() {
        println!("No open proposals.");
    }
    for proposal in open {
        println!(
            "#{} {} (proposer: {}, {}/{} voted)",
            proposal.id,
            proposal.title,
            proposal.proposer,
            proposal.votes.len(),
            proposal.voters.len(),
        );
    }
    println!("{}", votes.get_summary()?);
    Ok(())
}

pub async fn vote_propose(
    config: Config,
    title: String,
    description: String,
    proposer: String,
    voters: Vec<String>,
) -> Result<()> {
    let votes = VoteStore::new(data_path(&config, "votes.json"));
    let proposal = votes.propose(&title, &description, &proposer, voters)?;
    println!(
        "Opened proposal #{}: {} (voters: {})",
        proposal.id,
        proposal.title,
        proposal.voters.join(", ")
    );
    Ok(())
}

/// Cast a ballot. A vote that closes the proposal also pushes the
/// verdict to Telegram when a notifier is configured.
pub async fn vote_cast(
    config: Config,
    id: u64,
    agent: String,
    decision: String,
    reason: String,
) -> Result<()> {
    let votes = VoteStore::new(data_path(&config, "votes.json"));
    let message = votes.vote(id, &agent, &decision, &reason)?;
    println!("{message}");

    if message.contains("APPROVED") || message.contains("REJECTED") {
        let telegram = TelegramNotifier::new(&config.telegram);
        if let Some(proposal) = votes.get_proposal(id)? {
            telegram.send_vote_result(&proposal.title, &message).await;
        }
    }
    Ok(())
}

pub async fn vote_tally(config: Config, id: u64) -> Result<()> {
    let votes = VoteStore::new(data_path(&config, "votes.json"));
    println!("{}", votes.tally(id)?);
    Ok(())
}

pub async fn serve(config: Config, port: Option<u16>) -> Result<()> {
    let state = StatusAppState {
        backlog: Arc::new(BacklogManager::new(data_path(&config, "backlog.json"))),
        votes: Arc::new(VoteStore::new(data_path(&config, "votes.json"))),
        health: Arc::new(HealthMonitor::new(data_path(&config, "agent_health.json"))),
        leaderboard: Arc::new(Leaderboard::new(data_path(&config, "leaderboard.json"))),
        reports_dir: data_path(&config, "reports"),
    };
    let port = port.unwrap_or(config.http.port);
    serve_api(state, &config.http.bind_addr, port).await
}

fn task_table(tasks: &[Task]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Title", "Agent", "Priority", "Status", "Depends"]);
    for task in tasks {
        table.add_row(vec![
            Cell::new(task.id),
            Cell::new(&task.title),
            Cell::new(&task.assigned_to),
            Cell::new(&task.priority),
            Cell::new(task.status.as_str()),
            Cell::new(
                task.depends_on
                    .map_or_else(|| "-".to_string(), |d| format!("#{d}")),
            ),
        ]);
    }
    table
}
