//! Server configuration
//!
//! Built once at startup from the environment (after `.env` is loaded)
//! and CLI overrides, then shared read-only by every tool call.

use std::path::PathBuf;

use docsign_core::{ConfigError, NotifierConfig, ProvidersConfig};

/// Per tool call; covers provider round trips and document downloads
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_OUTPUT_DIR: &str = "./tmp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub timeout_ms: u64,
    /// Where filled and signed PDFs are written
    pub output_dir: PathBuf,
    pub providers: ProvidersConfig,
    pub notifier: NotifierConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let output_dir = lookup("OUTPUT_DIR")
            .map(|dir| dir.trim().to_string())
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok(Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            output_dir,
            providers: ProvidersConfig::from_lookup(&lookup)?,
            notifier: NotifierConfig::from_lookup(&lookup)?,
        })
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            providers: ProvidersConfig::default(),
            notifier: NotifierConfig::disabled(),
        }
    }
}
