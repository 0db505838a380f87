//! Read-only status API over the JSON stores.
//!
//! Serves dashboard-style views of the backlog, votes, health metrics,
//! and LLM usage. No write endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::adapters::store::{BacklogManager, HealthMonitor, Leaderboard, VoteStore};
use crate::application::reporter::DailyStats;
use crate::domain::errors::DomainError;

#[derive(Clone)]
pub struct StatusAppState {
    pub backlog: Arc<BacklogManager>,
    pub votes: Arc<VoteStore>,
    pub health: Arc<HealthMonitor>,
    pub leaderboard: Arc<Leaderboard>,
    pub reports_dir: PathBuf,
}

fn store_error(e: DomainError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
        .into_response()
}

/// Today's persisted counters, or zeros when no report has been written
/// yet.
fn todays_usage(reports_dir: &std::path::Path) -> DailyStats {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let path = reports_dir.join(format!("daily_report_{date}.yaml"));
    std::fs::read_to_string(path)
        .ok()
        .and_then(|yaml| serde_yaml::from_str(&yaml).ok())
        .unwrap_or_default()
}

async fn get_status(State(state): State<StatusAppState>) -> Response {
    let backlog_summary = match state.backlog.get_summary() {
        Ok(s) => s,
        Err(e) => return store_error(e),
    };
    let votes_summary = match state.votes.get_summary() {
        Ok(s) => s,
        Err(e) => return store_error(e),
    };
    let health = match state.health.status_all() {
        Ok(doc) => doc,
        Err(e) => return store_error(e),
    };
    let usage = todays_usage(&state.reports_dir);
    Json(json!({
        "backlog": backlog_summary,
        "votes": votes_summary,
        "agents": health.agents,
        "usage": {
            "api_calls": usage.total_api_calls,
            "total_tokens": usage.total_tokens,
            "cost_usd": usage.total_cost_usd,
        },
    }))
    .into_response()
}

async fn get_backlog(State(state): State<StatusAppState>) -> Response {
    match state.backlog.get_all_tasks() {
        Ok(tasks) => Json(json!({ "tasks": tasks })).into_response(),
        Err(e) => store_error(e),
    }
}

async fn get_health(State(state): State<StatusAppState>) -> Response {
    match state.health.status_all() {
        Ok(doc) => Json(json!({ "agents": doc.agents })).into_response(),
        Err(e) => store_error(e),
    }
}

async fn get_leaderboard(State(state): State<StatusAppState>) -> Response {
    match state.leaderboard.rankings(10) {
        Ok(strategies) => Json(json!({ "strategies": strategies })).into_response(),
        Err(e) => store_error(e),
    }
}

pub fn build_router(state: StatusAppState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/backlog", get(get_backlog))
        .route("/api/health", get(get_health))
        .route("/api/leaderboard", get(get_leaderboard))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn serve(state: StatusAppState, bind_addr: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = format!("{bind_addr}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "status API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
