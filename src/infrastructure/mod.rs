//! Infrastructure layer: configuration loading and logging setup.

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigLoader, env_or_dotenv};
