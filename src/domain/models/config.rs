use serde::{Deserialize, Serialize};

/// Main configuration structure for Foreman
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Workspace directory agents read and write files in
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: String,

    /// Directory holding the JSON state documents
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Telegram notification configuration
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Status API configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Paper trading configuration
    #[serde(default)]
    pub trading: TradingConfig,
}

fn default_workspace_dir() -> String {
    "workspace".to_string()
}

fn default_data_dir() -> String {
    ".foreman".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            data_dir: default_data_dir(),
            llm: LlmConfig::default(),
            rate_limit: RateLimitConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
            telegram: TelegramConfig::default(),
            http: HttpConfig::default(),
            trading: TradingConfig::default(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// OpenAI-compatible chat-completions endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model for routine calls
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used when the prompt sniffs as analytical work
    #[serde(default = "default_reasoner_model")]
    pub reasoner_model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion cap per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,

    /// Route heavy prompts to the reasoner model automatically
    #[serde(default = "default_true")]
    pub auto_upgrade: bool,
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_chat_model() -> String {
    "deepseek-chat".to_string()
}

fn default_reasoner_model() -> String {
    "deepseek-reasoner".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    4000
}

const fn default_http_timeout_secs() -> u64 {
    120
}

const fn default_true() -> bool {
    true
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            reasoner_model: default_reasoner_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_http_timeout_secs(),
            auto_upgrade: default_true(),
        }
    }
}

/// Sliding-window rate limits over a 60-second window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Calls allowed per minute
    #[serde(default = "default_calls_per_minute")]
    pub calls_per_minute: u32,

    /// Tokens allowed per minute
    #[serde(default = "default_tokens_per_minute")]
    pub tokens_per_minute: u64,
}

const fn default_calls_per_minute() -> u32 {
    50
}

const fn default_tokens_per_minute() -> u64 {
    100_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls_per_minute: default_calls_per_minute(),
            tokens_per_minute: default_tokens_per_minute(),
        }
    }
}

/// Task pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Think/act rounds per task attempt
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Pipeline sweeps per run
    #[serde(default = "default_max_pipeline_rounds")]
    pub max_pipeline_rounds: u32,

    /// Delay between agent startups in milliseconds
    #[serde(default = "default_startup_pacing_ms")]
    pub startup_pacing_ms: u64,

    /// Delay between pipeline rounds in seconds
    #[serde(default = "default_round_delay_secs")]
    pub round_delay_secs: u64,
}

const fn default_max_rounds() -> u32 {
    3
}

const fn default_max_pipeline_rounds() -> u32 {
    10
}

const fn default_startup_pacing_ms() -> u64 {
    1000
}

const fn default_round_delay_secs() -> u64 {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_pipeline_rounds: default_max_pipeline_rounds(),
            startup_pacing_ms: default_startup_pacing_ms(),
            round_delay_secs: default_round_delay_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional log file directory; stderr only when unset
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

/// Telegram notification configuration. Disabled unless both token and
/// chat id are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default)]
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

/// Read-only status API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8765
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

/// Paper trading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TradingConfig {
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
}

const fn default_initial_capital() -> f64 {
    10_000.0
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
        }
    }
}
