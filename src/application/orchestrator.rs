//! The Project Manager: wires agents, stores, and notifiers together
//! and drives the standup / seed / pipeline / plan cycle.
//!
//! Agents run one at a time within a round. Errors at this level are
//! logged and recorded to the checkpoint crash counter; the loop keeps
//! going rather than crashing the process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::adapters::store::{
    AgentMemory, BacklogManager, CheckpointStore, HealthMonitor, SharedMemory, VoteStore,
};
use crate::adapters::telegram::TelegramNotifier;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentRole, Config, RunPhase, Task, TaskStatus};
use crate::domain::ports::ChatClient;
use crate::services::dependency_graph::diagnose_stall;
use crate::services::tool_belt::ToolBelt;

use super::agent::Agent;
use super::planner::{EscalationDecision, Planner};
use super::reporter::DailyReporter;

const PROJECT_CONTEXT: &str = "The team is building an EURUSD trading research pipeline: \
market data collection, technical indicators, an SMA crossover strategy, a backtest \
engine, and system health monitoring. Work happens in a shared flat workspace directory.";

pub struct ProjectManager {
    config: Config,
    chat: Arc<dyn ChatClient>,
    agents: Vec<Agent>,
    tools: Arc<ToolBelt>,
    backlog: BacklogManager,
    votes: VoteStore,
    checkpoint: CheckpointStore,
    health: HealthMonitor,
    shared: Arc<SharedMemory>,
    planner: Planner,
    reporter: DailyReporter,
    telegram: TelegramNotifier,
    cycle: u32,
}

impl ProjectManager {
    pub fn new(config: Config, chat: Arc<dyn ChatClient>) -> DomainResult<Self> {
        let data_dir = PathBuf::from(&config.data_dir);
        let tools = Arc::new(
            ToolBelt::new(&config.workspace_dir).map_err(DomainError::from)?,
        );
        let shared = Arc::new(SharedMemory::new(data_dir.join("shared_memory.json")));

        let agents = AgentRole::all()
            .into_iter()
            .map(|role| {
                Agent::new(
                    role,
                    chat.clone(),
                    tools.clone(),
                    shared.clone(),
                    AgentMemory::new(role.name(), data_dir.join("memory")),
                    config.llm.temperature,
                    PROJECT_CONTEXT,
                )
            })
            .collect();

        let health = HealthMonitor::new(data_dir.join("agent_health.json"));
        let telegram = TelegramNotifier::new(&config.telegram);
        let planner = Planner::new(chat.clone(), config.llm.temperature);
        let reporter = DailyReporter::new(data_dir.join("reports"));

        Ok(Self {
            backlog: BacklogManager::new(data_dir.join("backlog.json")),
            votes: VoteStore::new(data_dir.join("votes.json")),
            checkpoint: CheckpointStore::new(data_dir.join("checkpoint.json")),
            config,
            chat,
            agents,
            tools,
            health,
            shared,
            planner,
            reporter,
            telegram,
            cycle: 0,
        })
    }

    pub fn backlog(&self) -> &BacklogManager {
        &self.backlog
    }

    pub fn votes(&self) -> &VoteStore {
        &self.votes
    }

    pub fn shared_memory(&self) -> &SharedMemory {
        &self.shared
    }

    /// Run pipeline cycles until the cap is reached (forever when
    /// `None`). Each cycle failure is recorded and survived.
    pub async fn run(&mut self, max_cycles: Option<u32>) {
        let run_id = uuid::Uuid::new_v4().to_string();
        match self.checkpoint.begin_run(&run_id) {
            Ok(Some(phase)) => {
                warn!(last_phase = phase.as_str(), "resuming after interrupted run")
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "checkpoint unavailable"),
        }

        loop {
            self.cycle += 1;
            info!(cycle = self.cycle, "pipeline cycle starting");
            self.telegram.send_cycle_start(self.cycle).await;
            self.reporter.record_cycle();

            if let Err(e) = self.run_cycle().await {
                error!(cycle = self.cycle, error = %e, "cycle failed");
                self.reporter.record_error(&e.to_string());
                if let Err(cp) = self.checkpoint.record_crash(&e.to_string()) {
                    warn!(error = %cp, "could not record crash");
                }
                self.telegram.send_error(&e.to_string()).await;
                self.shutdown_agents();
            }

            if max_cycles.is_some_and(|cap| self.cycle >= cap) {
                break;
            }
            tokio::time::sleep(Duration::from_secs(self.config.pipeline.round_delay_secs)).await;
        }
        self.finish().await;
    }

    /// One full cycle: startup, standup, seed, pipeline, plan, report.
    pub async fn run_cycle(&mut self) -> DomainResult<()> {
        self.checkpoint.mark_phase(RunPhase::Startup)?;
        self.startup_agents().await?;

        self.checkpoint.mark_phase(RunPhase::Standup)?;
        self.daily_standup().await;

        self.checkpoint.mark_phase(RunPhase::Seeding)?;
        if self.seed_backlog()? {
            info!("backlog seeded with the initial pipeline tasks");
        }

        self.checkpoint.mark_phase(RunPhase::Pipeline)?;
        let completed = self.pipeline_rounds().await?;
        self.telegram.send_pipeline_done(completed.len(), self.cycle).await;

        let proposed = self.auto_plan(&completed).await?;
        if !proposed.is_empty() {
            self.telegram.send_auto_plan(&proposed).await;
        }

        self.checkpoint.mark_phase(RunPhase::Reporting)?;
        self.report().await;

        self.checkpoint.mark_phase(RunPhase::Shutdown)?;
        self.shutdown_agents();
        Ok(())
    }

    /// Sequential startup with pacing between agents.
    async fn startup_agents(&mut self) -> DomainResult<()> {
        let pacing = Duration::from_millis(self.config.pipeline.startup_pacing_ms);
        for agent in &mut self.agents {
            agent.startup();
            self.health.register_agent(agent.name())?;
            tokio::time::sleep(pacing).await;
        }
        info!(count = self.agents.len(), "all agents started");
        Ok(())
    }

    /// Free-text status round, gathered from all agents at once. Reports
    /// are logged and archived, never parsed for structure.
    async fn daily_standup(&mut self) -> BTreeMap<String, String> {
        info!("daily standup");
        let outcomes = join_all(
            self.agents
                .iter_mut()
                .map(|agent| async { (agent.name(), agent.standup_report().await) }),
        )
        .await;
        let mut reports = BTreeMap::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(report) => {
                    info!(agent = name, "standup: {}", first_line(&report));
                    reports.insert(name.to_string(), report);
                }
                Err(e) => warn!(agent = name, error = %e, "standup unavailable"),
            }
        }
        if let Err(e) = self.reporter.save_standup(&reports) {
            warn!(error = %e, "could not archive standup");
        }
        reports
    }

    /// Start agents, hold one standup, shut down. For the CLI.
    pub async fn standup(&mut self) -> DomainResult<BTreeMap<String, String>> {
        self.startup_agents().await?;
        let reports = self.daily_standup().await;
        self.shutdown_agents();
        Ok(reports)
    }

    /// Populate the backlog with the five-stage starter pipeline. Only
    /// runs against an empty backlog.
    pub fn seed_backlog(&self) -> DomainResult<bool> {
        if !self.backlog.get_all_tasks()?.is_empty() {
            return Ok(false);
        }
        let t1 = self.backlog.add_task(
            "Download EURUSD market data",
            "data_scientist",
            "critical",
            "Download 3 months of EURUSD daily data. Save as eurusd_data.csv. \
             Report row count and date range.",
            None,
        )?;
        let t2 = self.backlog.add_task(
            "Calculate technical indicators",
            "data_scientist",
            "high",
            "Write a Python script that reads eurusd_data.csv and calculates \
             SMA(20), SMA(50), RSI(14), and MACD. Save results to eurusd_features.csv.",
            Some(t1.id),
        )?;
        let t3 = self.backlog.add_task(
            "Design SMA crossover strategy",
            "quant_analyst",
            "high",
            "Write strategy_sma_crossover.py: enter when SMA20 crosses above SMA50, \
             exit when it crosses below. Define position sizing (1% risk per trade), \
             an ATR-based stop loss, and the expected Sharpe ratio.",
            Some(t2.id),
        )?;
        self.backlog.add_task(
            "Write backtest engine",
            "engineer",
            "high",
            "Write backtest_sma.py that reads eurusd_features.csv and tests the SMA \
             crossover strategy. Output total trades, win rate, profit factor, and \
             max drawdown.",
            Some(t3.id),
        )?;
        self.backlog.add_task(
            "Create system health monitor",
            "devops",
            "medium",
            "Write health_check.py that checks disk space, memory usage, and data \
             freshness (last CSV modified time). Output a JSON health report.",
            None,
        )?;
        Ok(true)
    }

    /// Bounded pipeline loop: one runnable task per agent per round.
    /// Returns the titles of tasks completed.
    async fn pipeline_rounds(&mut self) -> DomainResult<Vec<String>> {
        let mut completed = Vec::new();
        let round_delay = Duration::from_secs(self.config.pipeline.round_delay_secs);

        for round in 1..=self.config.pipeline.max_pipeline_rounds {
            self.checkpoint.mark_round(round)?;
            info!(round, "pipeline round");
            let mut progressed = false;

            for idx in 0..self.agents.len() {
                let agent_name = self.agents[idx].name();
                let Some(task) = self.backlog.get_next_task(agent_name)? else {
                    continue;
                };
                progressed = true;
                if let Some(title) = self.run_task(idx, &task).await? {
                    completed.push(title);
                }
            }

            if !self.backlog.has_open_tasks()? {
                info!(round, "pipeline complete, no open tasks remain");
                break;
            }
            if !progressed {
                self.diagnose_deadlock()?;
                break;
            }

            for warning in self.health.check_health()? {
                self.telegram.send_error(&warning.message).await;
            }
            tokio::time::sleep(round_delay).await;
        }
        Ok(completed)
    }

    /// Drive one task through the retry loop and apply the outcome to
    /// the backlog. Returns the title when the task completed.
    async fn run_task(&mut self, agent_idx: usize, task: &Task) -> DomainResult<Option<String>> {
        let agent_name = self.agents[agent_idx].name();
        info!(task_id = task.id, agent = agent_name, title = %task.title, "assigning task");
        self.backlog.update_status(task.id, TaskStatus::InProgress)?;
        self.health.task_started(agent_name, &task.title)?;

        let tokens_before = self.chat.stats().total_tokens();
        let description = format!("Task #{}: {}\n{}", task.id, task.title, task.description);
        let report = self.agents[agent_idx]
            .execute_with_retry(&description, self.config.pipeline.max_rounds)
            .await;
        let tokens_used = self.chat.stats().total_tokens().saturating_sub(tokens_before);

        self.health
            .task_completed(agent_name, report.is_success(), tokens_used)?;
        self.reporter.record_task(report.is_success());

        if report.is_success() {
            self.backlog.update_status(task.id, TaskStatus::Done)?;
            self.checkpoint.record_completed_task(&task.title)?;
            if let Err(e) = self.agents[agent_idx].memory().remember_fact(
                &format!("task_{}_result", task.id),
                &format!("Completed: {}", task.title),
            ) {
                warn!(error = %e, "could not record task fact");
            }
            self.telegram
                .send_task_complete(&task.title, agent_name, report.rounds)
                .await;
            self.notify_dependents(task)?;
            Ok(Some(task.title.clone()))
        } else {
            let error = report.error.unwrap_or_else(|| "unknown error".to_string());
            warn!(task_id = task.id, agent = agent_name, error = %error, "task failed");
            self.reporter.record_error(&error);
            self.escalate(task, &error).await?;
            Ok(None)
        }
    }

    /// Tell the owners of directly dependent tasks their parent is done.
    fn notify_dependents(&mut self, task: &Task) -> DomainResult<()> {
        for dependent in self.backlog.dependents_of(task.id)? {
            let message = format!(
                "Task #{} '{}' is done; your task #{} '{}' is now unblocked.",
                task.id, task.title, dependent.id, dependent.title
            );
            if let Some(agent) = self
                .agents
                .iter_mut()
                .find(|a| a.name() == dependent.assigned_to)
            {
                agent.receive_message("project_manager", &message);
            }
        }
        Ok(())
    }

    /// Apply the model's SKIP / REASSIGN / SPLIT verdict for a task
    /// that exhausted its retries.
    async fn escalate(&mut self, task: &Task, error: &str) -> DomainResult<()> {
        match self.planner.escalation_decision(task, error).await {
            EscalationDecision::Skip => {
                self.backlog.update_status(task.id, TaskStatus::Blocked)?;
            }
            EscalationDecision::Reassign => {
                let next = next_assignee(&task.assigned_to);
                self.backlog.reassign_task(task.id, next)?;
            }
            EscalationDecision::Split => {
                let first = self.backlog.add_task(
                    &format!("{} (part 1)", task.title),
                    &task.assigned_to,
                    &task.priority,
                    &format!("First half of: {}", task.description),
                    task.depends_on,
                )?;
                self.backlog.add_task(
                    &format!("{} (part 2)", task.title),
                    &task.assigned_to,
                    &task.priority,
                    &format!("Second half of: {}", task.description),
                    Some(first.id),
                )?;
                self.backlog.update_status(task.id, TaskStatus::Blocked)?;
            }
        }
        Ok(())
    }

    /// No agent made progress but open work remains: either the
    /// dependency graph has a cycle or everything waits on blockers.
    fn diagnose_deadlock(&self) -> DomainResult<()> {
        let tasks = self.backlog.get_all_tasks()?;
        match diagnose_stall(&tasks) {
            Err(DomainError::DependencyCycle(cycle)) => {
                error!(?cycle, "dependency cycle is stalling the pipeline");
                Err(DomainError::DependencyCycle(cycle))
            }
            Err(e) => Err(e),
            Ok(blockers) => {
                warn!(
                    ?blockers,
                    "pipeline deadlocked: every open task waits on a blocker"
                );
                Ok(())
            }
        }
    }

    /// Ask the planner for follow-up tasks and add them to the backlog.
    /// Returns the new titles.
    async fn auto_plan(&mut self, completed: &[String]) -> DomainResult<Vec<String>> {
        if completed.is_empty() {
            return Ok(Vec::new());
        }
        let files = workspace_listing(self.tools.workspace_dir());
        let planned = self.planner.propose_tasks(completed, &files).await;
        let mut titles = Vec::new();
        for plan in planned {
            let task = self.backlog.add_task(
                &plan.title,
                &plan.assigned_to,
                &plan.priority,
                &plan.description,
                None,
            )?;
            titles.push(task.title);
        }
        Ok(titles)
    }

    async fn report(&mut self) {
        let stats = self.chat.stats();
        self.reporter
            .record_cost(stats.cost_usd, stats.total_tokens(), stats.calls);
        if let Err(e) = self.reporter.save_daily_report() {
            warn!(error = %e, "could not save daily report");
        }
        self.telegram.send_cost_report(&stats.summary()).await;
        match self.health.summary_text() {
            Ok(text) => info!("{text}"),
            Err(e) => warn!(error = %e, "health summary unavailable"),
        }
    }

    fn shutdown_agents(&mut self) {
        for agent in &mut self.agents {
            agent.shutdown();
        }
    }

    /// Final bookkeeping after the last cycle or an interrupt.
    pub async fn finish(&mut self) {
        self.shutdown_agents();
        if let Err(e) = self.checkpoint.mark_phase(RunPhase::Shutdown) {
            warn!(error = %e, "could not mark shutdown");
        }
        let report = self.reporter.summary_text();
        info!("{report}");
        self.telegram.send_cost_report(&report).await;
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Pick a different role for a reassigned task, walking the fixed role
/// order.
fn next_assignee(current: &str) -> &'static str {
    let all = AgentRole::all();
    match AgentRole::from_str(current) {
        Some(role) => {
            let idx = all.iter().position(|r| *r == role).unwrap_or(0);
            all[(idx + 1) % all.len()].name()
        }
        None => all[0].name(),
    }
}

/// Flat file listing of the workspace, for planning prompts.
fn workspace_listing(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_assignee_walks_roles() {
        assert_eq!(next_assignee("data_scientist"), "quant_analyst");
        assert_eq!(next_assignee("risk_manager"), "data_scientist");
        assert_eq!(next_assignee("someone_else"), "data_scientist");
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("status: fine\ndetails follow"), "status: fine");
        assert_eq!(first_line(""), "");
    }
}
