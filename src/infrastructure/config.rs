use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Workspace directory cannot be empty")]
    EmptyWorkspaceDir,

    #[error("Invalid calls_per_minute: {0}. Must be at least 1")]
    InvalidCallsPerMinute(u32),

    #[error("Invalid tokens_per_minute: {0}. Must be at least 1")]
    InvalidTokensPerMinute(u64),

    #[error("Invalid max_rounds: {0}. Must be at least 1")]
    InvalidMaxRounds(u32),

    #[error("Invalid temperature: {0}. Must be between 0.0 and 2.0")]
    InvalidTemperature(f32),

    #[error("Invalid initial_capital: {0}. Must be positive")]
    InvalidInitialCapital(f64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .foreman/config.yaml (project config)
    /// 3. .foreman/local.yaml (local overrides, optional)
    /// 4. Environment variables (FOREMAN_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".foreman/config.yaml"))
            .merge(Yaml::file(".foreman/local.yaml"))
            .merge(Env::prefixed("FOREMAN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.workspace_dir.is_empty() {
            return Err(ConfigError::EmptyWorkspaceDir);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.rate_limit.calls_per_minute == 0 {
            return Err(ConfigError::InvalidCallsPerMinute(
                config.rate_limit.calls_per_minute,
            ));
        }

        if config.rate_limit.tokens_per_minute == 0 {
            return Err(ConfigError::InvalidTokensPerMinute(
                config.rate_limit.tokens_per_minute,
            ));
        }

        if config.pipeline.max_rounds == 0 {
            return Err(ConfigError::InvalidMaxRounds(config.pipeline.max_rounds));
        }

        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(ConfigError::InvalidTemperature(config.llm.temperature));
        }

        if config.trading.initial_capital <= 0.0 {
            return Err(ConfigError::InvalidInitialCapital(
                config.trading.initial_capital,
            ));
        }

        Ok(())
    }
}

/// Look up a variable in the process environment, falling back to a
/// `KEY=value` line in a `.env` file in the current directory. Secrets
/// like `DEEPSEEK_API_KEY` and the Telegram credentials arrive this way
/// rather than through the YAML config.
pub fn env_or_dotenv(key: &str) -> Option<String> {
    if let Ok(value) = std::env::var(key) {
        if !value.is_empty() {
            return Some(value);
        }
    }
    let contents = std::fs::read_to_string(".env").ok()?;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                let v = v.trim().trim_matches('"').trim_matches('\'');
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.workspace_dir, "workspace");
        assert_eq!(config.llm.chat_model, "deepseek-chat");
        assert_eq!(config.pipeline.max_rounds, 3);
        assert_eq!(config.rate_limit.calls_per_minute, 50);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
workspace_dir: /tmp/ws
llm:
  chat_model: deepseek-chat
  reasoner_model: deepseek-reasoner
  temperature: 0.3
rate_limit:
  calls_per_minute: 10
  tokens_per_minute: 20000
pipeline:
  max_rounds: 5
logging:
  level: debug
  format: json
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(config.workspace_dir, "/tmp/ws");
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.rate_limit.calls_per_minute, 10);
        assert_eq!(config.pipeline.max_rounds, 5);
        assert_eq!(config.logging.level, "debug");
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidLogLevel(_))));
    }

    #[test]
    fn test_validate_zero_rate_limit() {
        let mut config = Config::default();
        config.rate_limit.calls_per_minute = 0;
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidCallsPerMinute(0))));
    }

    #[test]
    fn test_validate_zero_max_rounds() {
        let mut config = Config::default();
        config.pipeline.max_rounds = 0;
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidMaxRounds(0))));
    }

    #[test]
    fn test_validate_bad_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidTemperature(_))));
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "workspace_dir: base_ws\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "logging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.workspace_dir, "base_ws");
        assert_eq!(config.logging.level, "debug", "Override should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
