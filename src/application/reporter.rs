//! End-of-day reporting: per-day counters plus YAML artifacts under the
//! reports directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::errors::DomainResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: String,
    pub cycles_run: u32,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub total_cost_usd: f64,
    pub total_tokens: u64,
    pub total_api_calls: u64,
    pub errors: Vec<String>,
    pub highlights: Vec<String>,
}

impl Default for DailyStats {
    fn default() -> Self {
        Self::for_today()
    }
}

impl DailyStats {
    fn for_today() -> Self {
        Self {
            date: Local::now().format("%Y-%m-%d").to_string(),
            cycles_run: 0,
            tasks_completed: 0,
            tasks_failed: 0,
            total_cost_usd: 0.0,
            total_tokens: 0,
            total_api_calls: 0,
            errors: Vec::new(),
            highlights: Vec::new(),
        }
    }
}

/// Accumulates the day's counters and writes report files. Counters
/// reset automatically at the first record of a new day.
pub struct DailyReporter {
    reports_dir: PathBuf,
    stats: DailyStats,
}

impl DailyReporter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            stats: DailyStats::for_today(),
        }
    }

    pub fn stats(&self) -> &DailyStats {
        &self.stats
    }

    fn roll_date(&mut self) {
        let today = Local::now().format("%Y-%m-%d").to_string();
        if self.stats.date != today {
            self.stats = DailyStats::for_today();
        }
    }

    pub fn record_cycle(&mut self) {
        self.roll_date();
        self.stats.cycles_run += 1;
    }

    pub fn record_task(&mut self, success: bool) {
        self.roll_date();
        if success {
            self.stats.tasks_completed += 1;
        } else {
            self.stats.tasks_failed += 1;
        }
    }

    pub fn record_cost(&mut self, cost_usd: f64, tokens: u64, api_calls: u64) {
        self.roll_date();
        self.stats.total_cost_usd = cost_usd;
        self.stats.total_tokens = tokens;
        self.stats.total_api_calls = api_calls;
    }

    pub fn record_error(&mut self, error: &str) {
        self.roll_date();
        self.stats.errors.push(clip(error, 200).to_string());
        let len = self.stats.errors.len();
        if len > 10 {
            self.stats.errors.drain(..len - 10);
        }
    }

    pub fn add_highlight(&mut self, highlight: impl Into<String>) {
        self.roll_date();
        self.stats.highlights.push(highlight.into());
    }

    /// Human-readable summary, suitable for logs and Telegram.
    pub fn summary_text(&self) -> String {
        let s = &self.stats;
        let mut report = format!(
            "DAILY REPORT {}\nCycles: {} | Tasks done: {} | Failed: {}\nAPI: {} calls | {} tokens | ${:.4}",
            s.date,
            s.cycles_run,
            s.tasks_completed,
            s.tasks_failed,
            s.total_api_calls,
            s.total_tokens,
            s.total_cost_usd,
        );
        if !s.highlights.is_empty() {
            report.push_str("\nHighlights:");
            for h in s.highlights.iter().rev().take(5).rev() {
                report.push_str(&format!("\n- {h}"));
            }
        }
        if !s.errors.is_empty() {
            report.push_str(&format!("\nErrors ({}):", s.errors.len()));
            for e in s.errors.iter().rev().take(3).rev() {
                report.push_str(&format!("\n- {}", clip(e, 100)));
            }
        }
        report
    }

    /// Persist the day's stats as YAML.
    pub fn save_daily_report(&self) -> DomainResult<PathBuf> {
        let path = self
            .reports_dir
            .join(format!("daily_report_{}.yaml", self.stats.date));
        write_yaml(&path, &self.stats)?;
        Ok(path)
    }

    /// Persist a standup's free-text reports, one timestamped file per
    /// standup.
    pub fn save_standup(&self, reports: &BTreeMap<String, String>) -> DomainResult<PathBuf> {
        let path = self.reports_dir.join(format!(
            "daily_standup_{}.yaml",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        write_yaml(&path, reports)?;
        Ok(path)
    }
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> DomainResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(value)
        .map_err(|e| crate::domain::DomainError::Serialization(e.to_string()))?;
    std::fs::write(path, yaml)?;
    info!(path = %path.display(), "report saved");
    Ok(())
}

fn clip(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_counters_accumulate() {
        let dir = TempDir::new().unwrap();
        let mut reporter = DailyReporter::new(dir.path().join("reports"));
        reporter.record_cycle();
        reporter.record_task(true);
        reporter.record_task(true);
        reporter.record_task(false);
        reporter.record_cost(0.0123, 4500, 9);

        let text = reporter.summary_text();
        assert!(text.contains("Cycles: 1"));
        assert!(text.contains("Tasks done: 2 | Failed: 1"));
        assert!(text.contains("$0.0123"));
    }

    #[test]
    fn test_error_list_is_capped() {
        let dir = TempDir::new().unwrap();
        let mut reporter = DailyReporter::new(dir.path().join("reports"));
        for i in 0..14 {
            reporter.record_error(&format!("error {i}"));
        }
        assert_eq!(reporter.stats().errors.len(), 10);
        assert_eq!(reporter.stats().errors.last().unwrap(), "error 13");
    }

    #[test]
    fn test_standup_report_written() {
        let dir = TempDir::new().unwrap();
        let reporter = DailyReporter::new(dir.path().join("reports"));
        let mut reports = BTreeMap::new();
        reports.insert("engineer".to_string(), "Ready to build.".to_string());
        let path = reporter.save_standup(&reports).unwrap();
        assert!(path.exists());
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("engineer"));
        assert!(content.contains("Ready to build."));
    }

    #[test]
    fn test_daily_report_written() {
        let dir = TempDir::new().unwrap();
        let mut reporter = DailyReporter::new(dir.path().join("reports"));
        reporter.record_cycle();
        let path = reporter.save_daily_report().unwrap();
        assert!(path.exists());
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("cycles_run: 1"));
    }
}
