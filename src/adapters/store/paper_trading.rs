//! Paper trading: virtual positions and realized P&L over a price feed.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ClosedTrade, PortfolioDoc, PortfolioSummary, Position};
use crate::domain::ports::PriceFeed;

use super::document::JsonDocument;

/// Outcome of an open/close attempt. Failures are reported, not raised,
/// so they can flow back into an agent's transcript unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Opened { symbol: String, qty: f64, price: f64 },
    Closed(ClosedTrade),
    Refused(String),
}

pub struct PaperTrader {
    doc: JsonDocument<PortfolioDoc>,
    feed: Arc<dyn PriceFeed>,
    initial_capital: f64,
}

impl PaperTrader {
    pub fn new(path: impl Into<PathBuf>, feed: Arc<dyn PriceFeed>, initial_capital: f64) -> Self {
        Self {
            doc: JsonDocument::new(path),
            feed,
            initial_capital,
        }
    }

    fn load(&self) -> DomainResult<PortfolioDoc> {
        let doc = self.doc.load()?;
        // A fresh document starts from the configured capital, not the
        // model default.
        if doc.total_trades == 0
            && doc.positions.is_empty()
            && doc.closed_trades.is_empty()
            && (doc.initial_capital - self.initial_capital).abs() > f64::EPSILON
        {
            return Ok(PortfolioDoc::with_capital(self.initial_capital));
        }
        Ok(doc)
    }

    /// Open a long position. One position per symbol.
    pub fn open_position(
        &self,
        symbol: &str,
        qty: f64,
        price: Option<f64>,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> DomainResult<TradeOutcome> {
        let mut doc = self.load()?;
        if doc.positions.contains_key(symbol) {
            return Ok(TradeOutcome::Refused(format!(
                "Already have position in {symbol}"
            )));
        }
        let Some(price) = price.or_else(|| self.feed.price(symbol)) else {
            return Ok(TradeOutcome::Refused(format!(
                "Cannot get price for {symbol}"
            )));
        };
        let cost = price * qty;
        if cost > doc.capital {
            return Ok(TradeOutcome::Refused(format!(
                "Insufficient capital: need ${cost:.2}, have ${:.2}",
                doc.capital
            )));
        }
        doc.capital -= cost;
        doc.positions.insert(
            symbol.to_string(),
            Position {
                qty,
                entry_price: price,
                entry_time: Utc::now(),
                stop_loss,
                take_profit,
                cost,
            },
        );
        self.doc.save(&doc)?;
        info!(symbol, qty, price, "paper buy");
        Ok(TradeOutcome::Opened {
            symbol: symbol.to_string(),
            qty,
            price,
        })
    }

    /// Close a position and realize its P&L.
    pub fn close_position(&self, symbol: &str, price: Option<f64>) -> DomainResult<TradeOutcome> {
        let mut doc = self.load()?;
        let Some(pos) = doc.positions.get(symbol).cloned() else {
            return Ok(TradeOutcome::Refused(format!("No position in {symbol}")));
        };
        let Some(price) = price.or_else(|| self.feed.price(symbol)) else {
            return Ok(TradeOutcome::Refused(format!(
                "Cannot get price for {symbol}"
            )));
        };

        let pnl = (price - pos.entry_price) * pos.qty;
        let pnl_pct = (price / pos.entry_price - 1.0) * 100.0;

        doc.capital += price * pos.qty;
        doc.total_pnl += pnl;
        doc.total_trades += 1;
        if pnl > 0.0 {
            doc.wins += 1;
        } else {
            doc.losses += 1;
        }

        let trade = ClosedTrade {
            symbol: symbol.to_string(),
            entry_price: pos.entry_price,
            exit_price: price,
            qty: pos.qty,
            pnl: (pnl * 100.0).round() / 100.0,
            pnl_pct: (pnl_pct * 100.0).round() / 100.0,
            entry_time: pos.entry_time,
            exit_time: Utc::now(),
            trigger: None,
        };
        doc.closed_trades.push(trade.clone());
        doc.positions.remove(symbol);
        self.doc.save(&doc)?;
        info!(symbol, price, pnl = trade.pnl, "paper sell");
        Ok(TradeOutcome::Closed(trade))
    }

    /// Force-close any position whose stop-loss or take-profit level is
    /// breached at the current feed price.
    pub fn check_stops(&self) -> DomainResult<Vec<ClosedTrade>> {
        let doc = self.load()?;
        let mut triggered = Vec::new();
        for (symbol, pos) in &doc.positions {
            let Some(price) = self.feed.price(symbol) else {
                continue;
            };
            let trigger = if pos.stop_loss.is_some_and(|sl| price <= sl) {
                Some("stop_loss")
            } else if pos.take_profit.is_some_and(|tp| price >= tp) {
                Some("take_profit")
            } else {
                None
            };
            if let Some(kind) = trigger {
                if let TradeOutcome::Closed(mut trade) =
                    self.close_position(symbol, Some(price))?
                {
                    trade.trigger = Some(kind.to_string());
                    triggered.push(trade);
                }
            }
        }
        Ok(triggered)
    }

    /// Mark-to-market portfolio summary.
    pub fn portfolio_summary(&self) -> DomainResult<PortfolioSummary> {
        let doc = self.load()?;
        let mut positions_value = 0.0;
        for (symbol, pos) in &doc.positions {
            let price = self.feed.price(symbol).unwrap_or(pos.entry_price);
            positions_value += price * pos.qty;
        }
        let total_equity = doc.capital + positions_value;
        let total_return = (total_equity / doc.initial_capital - 1.0) * 100.0;
        Ok(PortfolioSummary {
            total_equity,
            cash: doc.capital,
            positions_value,
            open_positions: doc.positions.len(),
            total_pnl: doc.total_pnl,
            total_return_pct: total_return,
            total_trades: doc.total_trades,
            win_rate: doc.win_rate(),
            wins: doc.wins,
            losses: doc.losses,
        })
    }

    pub fn summary_text(&self) -> DomainResult<String> {
        let s = self.portfolio_summary()?;
        Ok(format!(
            "Paper Trading Portfolio:\n  Equity: ${:.2}\n  Return: {:+.1}%\n  Win Rate: {:.0}% ({}W/{}L)\n  Trades: {} | Open: {}",
            s.total_equity,
            s.total_return_pct,
            s.win_rate,
            s.wins,
            s.losses,
            s.total_trades,
            s.open_positions
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::StaticFeed;
    use tempfile::TempDir;

    fn trader(dir: &TempDir, prices: &[(&str, f64)]) -> PaperTrader {
        PaperTrader::new(
            dir.path().join("paper_trading.json"),
            Arc::new(StaticFeed::new(prices)),
            10_000.0,
        )
    }

    #[test]
    fn test_open_and_close_realizes_pnl() {
        let dir = TempDir::new().unwrap();
        let trader = trader(&dir, &[("EURUSD", 1.10)]);
        let opened = trader
            .open_position("EURUSD", 1000.0, Some(1.00), None, None)
            .unwrap();
        assert!(matches!(opened, TradeOutcome::Opened { .. }));

        let closed = trader.close_position("EURUSD", None).unwrap();
        let TradeOutcome::Closed(trade) = closed else {
            panic!("expected a close");
        };
        assert!((trade.pnl - 100.0).abs() < 0.01);

        let summary = trader.portfolio_summary().unwrap();
        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.wins, 1);
        assert!((summary.total_equity - 10_100.0).abs() < 0.01);
    }

    #[test]
    fn test_rejects_double_position() {
        let dir = TempDir::new().unwrap();
        let trader = trader(&dir, &[("EURUSD", 1.10)]);
        trader
            .open_position("EURUSD", 100.0, None, None, None)
            .unwrap();
        let second = trader
            .open_position("EURUSD", 100.0, None, None, None)
            .unwrap();
        assert_eq!(
            second,
            TradeOutcome::Refused("Already have position in EURUSD".to_string())
        );
    }

    #[test]
    fn test_rejects_insufficient_capital() {
        let dir = TempDir::new().unwrap();
        let trader = trader(&dir, &[("EURUSD", 1.10)]);
        let outcome = trader
            .open_position("EURUSD", 100_000.0, None, None, None)
            .unwrap();
        assert!(matches!(outcome, TradeOutcome::Refused(msg) if msg.starts_with("Insufficient capital")));
    }

    #[test]
    fn test_stop_loss_triggers() {
        let dir = TempDir::new().unwrap();
        let trader = trader(&dir, &[("EURUSD", 0.95)]);
        trader
            .open_position("EURUSD", 100.0, Some(1.00), Some(0.97), None)
            .unwrap();
        let triggered = trader.check_stops().unwrap();
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].trigger.as_deref(), Some("stop_loss"));
        assert!(trader.portfolio_summary().unwrap().open_positions == 0);
    }

    #[test]
    fn test_unknown_symbol_refused() {
        let dir = TempDir::new().unwrap();
        let trader = trader(&dir, &[]);
        let outcome = trader
            .open_position("GBPUSD", 100.0, None, None, None)
            .unwrap();
        assert_eq!(
            outcome,
            TradeOutcome::Refused("Cannot get price for GBPUSD".to_string())
        );
    }
}
