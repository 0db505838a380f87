//! Paper-trading portfolio and strategy leaderboard models.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open simulated position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub qty: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub cost: f64,
}

/// A closed trade with realized P&L.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub qty: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

/// Whole-document paper-trading state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioDoc {
    pub capital: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub total_pnl: f64,
    pub total_trades: u64,
    pub wins: u64,
    pub losses: u64,
    pub created: DateTime<Utc>,
}

impl Default for PortfolioDoc {
    fn default() -> Self {
        Self::with_capital(10_000.0)
    }
}

impl PortfolioDoc {
    pub fn with_capital(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            closed_trades: Vec::new(),
            total_pnl: 0.0,
            total_trades: 0,
            wins: 0,
            losses: 0,
            created: Utc::now(),
        }
    }

    pub fn win_rate(&self) -> f64 {
        self.wins as f64 / self.total_trades.max(1) as f64 * 100.0
    }
}

/// Snapshot summary of the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_equity: f64,
    pub cash: f64,
    pub positions_value: f64,
    pub open_positions: usize,
    pub total_pnl: f64,
    pub total_return_pct: f64,
    pub total_trades: u64,
    pub win_rate: f64,
    pub wins: u64,
    pub losses: u64,
}

/// One strategy's entry on the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub name: String,
    #[serde(default)]
    pub sharpe_ratio: f64,
    #[serde(default)]
    pub total_return_pct: f64,
    #[serde(default)]
    pub max_drawdown_pct: f64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub profit_factor: f64,
    #[serde(default = "default_author")]
    pub created_by: String,
    pub timestamp: DateTime<Utc>,
}

fn default_author() -> String {
    "unknown".to_string()
}

/// Whole-document leaderboard state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardDoc {
    pub strategies: Vec<StrategyEntry>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_rate_with_no_trades() {
        let doc = PortfolioDoc::default();
        assert_eq!(doc.win_rate(), 0.0);
    }

    #[test]
    fn test_win_rate() {
        let mut doc = PortfolioDoc::default();
        doc.total_trades = 4;
        doc.wins = 3;
        doc.losses = 1;
        assert_eq!(doc.win_rate(), 75.0);
    }
}
