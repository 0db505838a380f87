//! Strategy performance leaderboard.

use std::path::PathBuf;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::{LeaderboardDoc, StrategyEntry};

use super::document::JsonDocument;

pub struct Leaderboard {
    doc: JsonDocument<LeaderboardDoc>,
}

impl Leaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    /// Add or update a strategy's metrics. Names are unique; a repeat
    /// submission replaces the previous entry.
    pub fn add_strategy(
        &self,
        name: &str,
        metrics: &serde_json::Map<String, Value>,
    ) -> DomainResult<()> {
        let entry = StrategyEntry {
            name: name.to_string(),
            sharpe_ratio: metric(metrics, "sharpe_ratio"),
            total_return_pct: metric(metrics, "total_return_pct"),
            max_drawdown_pct: metric(metrics, "max_drawdown_pct"),
            win_rate: metric(metrics, "win_rate"),
            total_trades: metrics
                .get("total_trades")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            profit_factor: metric(metrics, "profit_factor"),
            created_by: metrics
                .get("created_by")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            timestamp: Utc::now(),
        };
        let sharpe = entry.sharpe_ratio;
        self.doc.update(|data| {
            match data.strategies.iter_mut().find(|s| s.name == name) {
                Some(existing) => *existing = entry,
                None => data.strategies.push(entry),
            }
            data.last_updated = Some(Utc::now());
        })?;
        info!(strategy = name, sharpe, "leaderboard updated");
        Ok(())
    }

    /// Top strategies by Sharpe ratio, best first.
    pub fn rankings(&self, top_n: usize) -> DomainResult<Vec<StrategyEntry>> {
        let mut strategies = self.doc.load()?.strategies;
        strategies.sort_by(|a, b| b.sharpe_ratio.total_cmp(&a.sharpe_ratio));
        strategies.truncate(top_n);
        Ok(strategies)
    }

    pub fn best_strategy(&self) -> DomainResult<Option<StrategyEntry>> {
        Ok(self.rankings(1)?.into_iter().next())
    }

    pub fn remove_strategy(&self, name: &str) -> DomainResult<()> {
        self.doc.update(|data| {
            data.strategies.retain(|s| s.name != name);
            data.last_updated = Some(Utc::now());
        })
    }

    /// Formatted top-five for reports and notifications.
    pub fn leaderboard_text(&self) -> DomainResult<String> {
        let rankings = self.rankings(5)?;
        if rankings.is_empty() {
            return Ok("Leaderboard: No strategies yet".to_string());
        }
        let mut lines = vec!["Strategy Leaderboard:".to_string()];
        for (i, s) in rankings.iter().enumerate() {
            lines.push(format!(
                "  #{} {}: Sharpe={:.2} | Return={:+.1}% | DD={:.1}% | WR={:.0}%",
                i + 1,
                s.name,
                s.sharpe_ratio,
                s.total_return_pct,
                s.max_drawdown_pct,
                s.win_rate
            ));
        }
        Ok(lines.join("\n"))
    }
}

fn metric(metrics: &serde_json::Map<String, Value>, key: &str) -> f64 {
    metrics.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn metrics(sharpe: f64) -> serde_json::Map<String, Value> {
        json!({
            "sharpe_ratio": sharpe,
            "total_return_pct": 12.5,
            "max_drawdown_pct": 4.0,
            "win_rate": 55.0,
            "total_trades": 40,
            "created_by": "quant_analyst",
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_rankings_sorted_by_sharpe() {
        let dir = TempDir::new().unwrap();
        let board = Leaderboard::new(dir.path().join("leaderboard.json"));
        board.add_strategy("sma_cross", &metrics(0.9)).unwrap();
        board.add_strategy("mean_revert", &metrics(1.7)).unwrap();
        let rankings = board.rankings(10).unwrap();
        assert_eq!(rankings[0].name, "mean_revert");
        assert_eq!(rankings[1].name, "sma_cross");
    }

    #[test]
    fn test_resubmission_replaces_entry() {
        let dir = TempDir::new().unwrap();
        let board = Leaderboard::new(dir.path().join("leaderboard.json"));
        board.add_strategy("sma_cross", &metrics(0.9)).unwrap();
        board.add_strategy("sma_cross", &metrics(1.4)).unwrap();
        let rankings = board.rankings(10).unwrap();
        assert_eq!(rankings.len(), 1);
        assert!((rankings[0].sharpe_ratio - 1.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_leaderboard_text() {
        let dir = TempDir::new().unwrap();
        let board = Leaderboard::new(dir.path().join("leaderboard.json"));
        assert_eq!(
            board.leaderboard_text().unwrap(),
            "Leaderboard: No strategies yet"
        );
    }

    #[test]
    fn test_remove_strategy() {
        let dir = TempDir::new().unwrap();
        let board = Leaderboard::new(dir.path().join("leaderboard.json"));
        board.add_strategy("sma_cross", &metrics(0.9)).unwrap();
        board.remove_strategy("sma_cross").unwrap();
        assert!(board.best_strategy().unwrap().is_none());
    }
}
