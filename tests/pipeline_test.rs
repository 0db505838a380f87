//! End-to-end pipeline tests: seeded backlog, dependency ordering, and
//! a full orchestrator cycle against a scripted chat client.

use std::sync::Arc;

use tempfile::TempDir;

use foreman::adapters::llm::MockChatClient;
use foreman::adapters::store::BacklogManager;
use foreman::application::ProjectManager;
use foreman::domain::models::{Config, TaskStatus};

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.workspace_dir = dir.path().join("workspace").to_string_lossy().into_owned();
    config.data_dir = dir.path().join(".foreman").to_string_lossy().into_owned();
    config.pipeline.startup_pacing_ms = 0;
    config.pipeline.round_delay_secs = 0;
    config
}

#[tokio::test]
async fn test_dependency_surfaces_only_after_parent_done() {
    let dir = TempDir::new().unwrap();
    let backlog = BacklogManager::new(dir.path().join("backlog.json"));

    let t1 = backlog
        .add_task("Download data", "data_scientist", "critical", "", None)
        .unwrap();
    let t2 = backlog
        .add_task("Build features", "data_scientist", "high", "", Some(t1.id))
        .unwrap();

    // Only the parent is runnable while it is open.
    let next = backlog.get_next_task("data_scientist").unwrap().unwrap();
    assert_eq!(next.id, t1.id);
    backlog.update_status(t1.id, TaskStatus::InProgress).unwrap();
    assert!(backlog.get_next_task("data_scientist").unwrap().is_none());

    backlog.update_status(t1.id, TaskStatus::Done).unwrap();
    let next = backlog.get_next_task("data_scientist").unwrap().unwrap();
    assert_eq!(next.id, t2.id);
}

#[tokio::test]
async fn test_seeding_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let chat = Arc::new(MockChatClient::scripted(&[]));
    let pm = ProjectManager::new(config, chat).unwrap();

    assert!(pm.seed_backlog().unwrap());
    let count = pm.backlog().get_all_tasks().unwrap().len();
    assert_eq!(count, 5);

    // A second call must not add duplicates.
    assert!(!pm.seed_backlog().unwrap());
    assert_eq!(pm.backlog().get_all_tasks().unwrap().len(), count);
}

#[tokio::test]
async fn test_full_cycle_completes_seeded_pipeline() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    // Every reply is the benign default: no commands, no promised
    // files, so each task succeeds on its first round.
    let chat = Arc::new(MockChatClient::scripted(&[]));
    let mut pm = ProjectManager::new(config, chat).unwrap();

    pm.run_cycle().await.unwrap();

    let tasks = pm.backlog().get_all_tasks().unwrap();
    let done: Vec<&str> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Done)
        .map(|t| t.title.as_str())
        .collect();

    // All five seeded tasks completed, in dependency order.
    assert_eq!(done.len(), 5, "summary: {:?}", tasks);
    assert!(done.contains(&"Download EURUSD market data"));
    assert!(done.contains(&"Write backtest engine"));
    for task in tasks.iter().filter(|t| t.status == TaskStatus::Done) {
        assert!(task.completed_at.is_some());
        if let Some(dep) = task.depends_on {
            let parent = tasks.iter().find(|t| t.id == dep).unwrap();
            assert!(parent.completed_at.unwrap() <= task.completed_at.unwrap());
        }
    }

    // The auto-plan step added follow-up work (canned fallback, since
    // the scripted client returns prose).
    let todo = tasks.iter().filter(|t| t.status == TaskStatus::Todo).count();
    assert_eq!(todo, 3);

    // A standup archive was written.
    let reports_dir = dir.path().join(".foreman/reports");
    let standups: Vec<_> = std::fs::read_dir(&reports_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("daily_standup_"))
        .collect();
    assert_eq!(standups.len(), 1);
}

#[tokio::test]
async fn test_failing_task_is_escalated_not_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.pipeline.max_rounds = 1;
    config.pipeline.max_pipeline_rounds = 1;

    // Standups for the five agents, then the single pipeline task
    // promises a file it never writes, then the escalation reply.
    let mut replies = vec!["Ready."; 5];
    replies.push("I will produce results.csv now.");
    replies.push("SKIP - not worth retrying");
    let chat = Arc::new(MockChatClient::scripted(&replies));

    let pm_backlog = BacklogManager::new(
        std::path::Path::new(&config.data_dir).join("backlog.json"),
    );
    pm_backlog
        .add_task("Produce results", "data_scientist", "high", "", None)
        .unwrap();

    let mut pm = ProjectManager::new(config, chat).unwrap();
    pm.run_cycle().await.unwrap();

    let task = pm.backlog().get_task(1).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Blocked);
    assert!(task.completed_at.is_none());
}
