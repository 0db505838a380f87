//! Agent roles and runtime status.
//!
//! All agents share one execution loop; roles differ only in their prompt
//! instructions and display identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five role flavors in the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    DataScientist,
    QuantAnalyst,
    Engineer,
    DevOps,
    RiskManager,
}

impl AgentRole {
    /// All roles, in orchestrator startup and pipeline iteration order.
    pub fn all() -> [Self; 5] {
        [
            Self::DataScientist,
            Self::QuantAnalyst,
            Self::Engineer,
            Self::DevOps,
            Self::RiskManager,
        ]
    }

    /// Stable agent name used in the backlog, memory files, and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DataScientist => "data_scientist",
            Self::QuantAnalyst => "quant_analyst",
            Self::Engineer => "engineer",
            Self::DevOps => "devops",
            Self::RiskManager => "risk_manager",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DataScientist => "Data Scientist",
            Self::QuantAnalyst => "Quant Analyst",
            Self::Engineer => "Engineer",
            Self::DevOps => "DevOps",
            Self::RiskManager => "Risk Manager",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "data_scientist" => Some(Self::DataScientist),
            "quant_analyst" => Some(Self::QuantAnalyst),
            "engineer" => Some(Self::Engineer),
            "devops" => Some(Self::DevOps),
            "risk_manager" => Some(Self::RiskManager),
            _ => None,
        }
    }

    /// Role-specific system prompt section.
    pub fn instructions(&self) -> &'static str {
        match self {
            Self::DataScientist => {
                "You are the Data Scientist of the trading research team.\n\
                 Your expertise: market data pipelines (OHLCV collection, cleaning, \
                 validation), feature engineering (SMA, EMA, RSI, MACD, Bollinger \
                 Bands, returns, volatility) and the ML model lifecycle (training, \
                 cross-validation, drift monitoring). Save data as CSV and always \
                 report row counts and date ranges for downloaded data."
            }
            Self::QuantAnalyst => {
                "You are the Quant Analyst of the trading research team.\n\
                 Your expertise: trading strategy design (momentum, mean reversion, \
                 hybrid ML signals), backtesting with walk-forward analysis and \
                 transaction cost modeling, and risk metrics. Always report Sharpe \
                 ratio, max drawdown, win rate, and profit factor for any strategy \
                 you evaluate."
            }
            Self::Engineer => {
                "You are the Software Engineer of the trading research team.\n\
                 Your expertise: production-quality Python, backtest engines, data \
                 pipelines, and test coverage. Write small, runnable scripts with \
                 clear output; prefer standard-library solutions over heavy \
                 dependencies."
            }
            Self::DevOps => {
                "You are the DevOps engineer of the trading research team.\n\
                 Your expertise: system health monitoring (disk, memory, data \
                 freshness), log management, and deployment hygiene. Produce JSON \
                 health reports and keep scripts idempotent."
            }
            Self::RiskManager => {
                "You are the Risk Manager of the trading research team.\n\
                 Your responsibilities: position sizing (fixed-fractional, max 5% \
                 of capital per trade), drawdown limits (max 15% portfolio \
                 drawdown), and stop-loss discipline (always required, max 2% of \
                 capital). When reviewing strategies, always check for a stop-loss \
                 and a defined position size."
            }
        }
    }
}

/// Coarse lifecycle state of a running agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Created,
    Idle,
    Working,
    Error,
    ShutDown,
}

/// Mutable status block each agent carries for monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub state: AgentState,
    pub last_activity: Option<String>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub errors: Vec<String>,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self {
            state: AgentState::Created,
            last_activity: None,
            last_activity_at: None,
            errors: Vec::new(),
        }
    }
}

impl AgentStatus {
    pub fn record_activity(&mut self, activity: impl Into<String>) {
        self.last_activity = Some(activity.into());
        self.last_activity_at = Some(Utc::now());
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        // Keep the tail only.
        if self.errors.len() > 20 {
            let drop = self.errors.len() - 20;
            self.errors.drain(0..drop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_round_trip() {
        for role in AgentRole::all() {
            assert_eq!(AgentRole::from_str(role.name()), Some(role));
        }
    }

    #[test]
    fn test_unknown_role() {
        assert_eq!(AgentRole::from_str("trading_assistant"), None);
    }

    #[test]
    fn test_status_error_cap() {
        let mut status = AgentStatus::default();
        for i in 0..30 {
            status.record_error(format!("e{i}"));
        }
        assert_eq!(status.errors.len(), 20);
        assert_eq!(status.errors.last().unwrap(), "e29");
    }
}
