//! Cross-agent knowledge store: insights, patterns, strategy results,
//! and warnings in one shared JSON document.

use std::path::PathBuf;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::memory::{
    Insight, PATTERN_CAP, PatternRecord, SharedMemoryDoc, StrategyResult, WARNING_CAP,
    WarningRecord,
};

use super::document::JsonDocument;

pub struct SharedMemory {
    doc: JsonDocument<SharedMemoryDoc>,
}

impl SharedMemory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    /// Publish a discovery other agents can read. Re-sharing a key
    /// overwrites the previous value.
    pub fn share_insight(&self, agent_name: &str, key: &str, value: &str) -> DomainResult<()> {
        self.doc.update(|data| {
            data.insights.insert(
                key.to_string(),
                Insight {
                    value: value.to_string(),
                    author: agent_name.to_string(),
                    timestamp: Utc::now(),
                },
            );
        })?;
        info!(agent = agent_name, key, "shared insight");
        Ok(())
    }

    pub fn get_insight(&self, key: &str) -> DomainResult<Option<String>> {
        let data = self.doc.load()?;
        Ok(data.insights.get(key).map(|i| i.value.clone()))
    }

    pub fn share_pattern(
        &self,
        agent_name: &str,
        pattern: &str,
        confidence: f64,
    ) -> DomainResult<()> {
        self.doc.update(|data| {
            data.patterns.push(PatternRecord {
                pattern: pattern.to_string(),
                confidence,
                author: agent_name.to_string(),
                timestamp: Utc::now(),
            });
            let len = data.patterns.len();
            if len > PATTERN_CAP {
                data.patterns.drain(..len - PATTERN_CAP);
            }
        })
    }

    pub fn get_patterns(&self, min_confidence: f64) -> DomainResult<Vec<PatternRecord>> {
        let data = self.doc.load()?;
        Ok(data
            .patterns
            .into_iter()
            .filter(|p| p.confidence >= min_confidence)
            .collect())
    }

    /// Record a strategy's backtest metrics, overwriting by name.
    pub fn share_strategy_result(
        &self,
        strategy_name: &str,
        metrics: &serde_json::Map<String, Value>,
    ) -> DomainResult<()> {
        self.doc.update(|data| {
            let sharpe = metrics
                .get("sharpe_ratio")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let drawdown = metrics.get("max_drawdown").and_then(Value::as_f64);
            let mut extra: std::collections::HashMap<String, Value> = metrics
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            extra.remove("sharpe_ratio");
            extra.remove("max_drawdown");
            data.strategies.insert(
                strategy_name.to_string(),
                StrategyResult {
                    sharpe_ratio: sharpe,
                    max_drawdown: drawdown,
                    extra,
                    timestamp: Utc::now(),
                },
            );
        })
    }

    /// Strategy with the highest Sharpe ratio.
    pub fn get_best_strategy(&self) -> DomainResult<Option<(String, StrategyResult)>> {
        let data = self.doc.load()?;
        Ok(data
            .strategies
            .into_iter()
            .max_by(|a, b| a.1.sharpe_ratio.total_cmp(&b.1.sharpe_ratio)))
    }

    pub fn add_warning(&self, agent_name: &str, warning: &str) -> DomainResult<()> {
        self.doc.update(|data| {
            data.warnings.push(WarningRecord {
                warning: warning.to_string(),
                author: agent_name.to_string(),
                timestamp: Utc::now(),
            });
            let len = data.warnings.len();
            if len > WARNING_CAP {
                data.warnings.drain(..len - WARNING_CAP);
            }
        })
    }

    /// Prompt-ready digest for one agent: the five most recent insights
    /// written by other agents, the last five patterns, the last three
    /// strategy results, and the last three warnings. Empty when the
    /// store has nothing to say.
    pub fn context_for_agent(&self, agent_name: &str) -> DomainResult<String> {
        let data = self.doc.load()?;
        let mut parts: Vec<String> = Vec::new();

        let mut other_insights: Vec<(&String, &Insight)> = data
            .insights
            .iter()
            .filter(|(_, v)| v.author != agent_name)
            .collect();
        other_insights.sort_by_key(|(_, v)| v.timestamp);
        if !other_insights.is_empty() {
            parts.push("=== SHARED KNOWLEDGE ===".to_string());
            for (key, val) in other_insights.iter().rev().take(5).rev() {
                parts.push(format!(
                    "- {key} (by {}): {}",
                    val.author,
                    truncate(&val.value, 200)
                ));
            }
        }

        let patterns: Vec<&PatternRecord> = data.patterns.iter().rev().take(5).rev().collect();
        if !patterns.is_empty() {
            parts.push("\n=== DISCOVERED PATTERNS ===".to_string());
            for p in patterns {
                parts.push(format!(
                    "- [{:.0}%] {} (by {})",
                    p.confidence * 100.0,
                    truncate(&p.pattern, 150),
                    p.author
                ));
            }
        }

        if !data.strategies.is_empty() {
            let mut strategies: Vec<(&String, &StrategyResult)> = data.strategies.iter().collect();
            strategies.sort_by_key(|(_, s)| s.timestamp);
            parts.push("\n=== STRATEGY RESULTS ===".to_string());
            for (name, s) in strategies.iter().rev().take(3).rev() {
                let dd = s
                    .max_drawdown
                    .map_or_else(|| "N/A".to_string(), |v| v.to_string());
                parts.push(format!("- {name}: Sharpe={}, MaxDD={dd}", s.sharpe_ratio));
            }
        }

        let warnings: Vec<&WarningRecord> = data.warnings.iter().rev().take(3).rev().collect();
        if !warnings.is_empty() {
            parts.push("\n=== WARNINGS ===".to_string());
            for w in warnings {
                parts.push(format!("WARNING: {} (by {})", w.warning, w.author));
            }
        }

        Ok(parts.join("\n"))
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> SharedMemory {
        SharedMemory::new(dir.path().join("shared_memory.json"))
    }

    #[test]
    fn test_insight_overwrites_by_key() {
        let dir = TempDir::new().unwrap();
        let shared = store(&dir);
        shared.share_insight("data_scientist", "spread", "1.2 pips").unwrap();
        shared.share_insight("quant_analyst", "spread", "1.5 pips").unwrap();
        assert_eq!(shared.get_insight("spread").unwrap().unwrap(), "1.5 pips");
    }

    #[test]
    fn test_patterns_capped_at_fifty() {
        let dir = TempDir::new().unwrap();
        let shared = store(&dir);
        for i in 0..60 {
            shared
                .share_pattern("quant_analyst", &format!("pattern {i}"), 0.9)
                .unwrap();
        }
        let patterns = shared.get_patterns(0.0).unwrap();
        assert_eq!(patterns.len(), PATTERN_CAP);
        assert_eq!(patterns.last().unwrap().pattern, "pattern 59");
    }

    #[test]
    fn test_pattern_confidence_filter() {
        let dir = TempDir::new().unwrap();
        let shared = store(&dir);
        shared.share_pattern("a", "weak", 0.2).unwrap();
        shared.share_pattern("a", "strong", 0.9).unwrap();
        let patterns = shared.get_patterns(0.5).unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern, "strong");
    }

    #[test]
    fn test_best_strategy_by_sharpe() {
        let dir = TempDir::new().unwrap();
        let shared = store(&dir);
        let mut low = serde_json::Map::new();
        low.insert("sharpe_ratio".into(), 0.8.into());
        let mut high = serde_json::Map::new();
        high.insert("sharpe_ratio".into(), 1.9.into());
        shared.share_strategy_result("sma_cross", &low).unwrap();
        shared.share_strategy_result("mean_revert", &high).unwrap();
        let (name, result) = shared.get_best_strategy().unwrap().unwrap();
        assert_eq!(name, "mean_revert");
        assert!((result.sharpe_ratio - 1.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_context_excludes_own_insights() {
        let dir = TempDir::new().unwrap();
        let shared = store(&dir);
        shared.share_insight("engineer", "mine", "own note").unwrap();
        shared.share_insight("devops", "theirs", "other note").unwrap();
        let ctx = shared.context_for_agent("engineer").unwrap();
        assert!(ctx.contains("theirs"));
        assert!(!ctx.contains("own note"));
    }

    #[test]
    fn test_empty_store_gives_empty_context() {
        let dir = TempDir::new().unwrap();
        let shared = store(&dir);
        assert_eq!(shared.context_for_agent("engineer").unwrap(), "");
    }
}
