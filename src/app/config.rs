//! Application configuration
//!
//! This module handles application-wide configuration settings.

use crate::config::PipelineConfig;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Application configuration structure
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Optional TOML file with pipeline settings
    pub config_file: Option<PathBuf>,
    /// Pipeline settings after applying the config file and CLI overrides
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Create a new application configuration
    pub fn new(verbose: u8) -> Self {
        Self {
            verbose,
            config_file: None,
            pipeline: PipelineConfig::default(),
        }
    }

    /// Load pipeline settings from a TOML file
    pub fn with_config_file(mut self, path: &Path) -> Result<Self> {
        self.pipeline = PipelineConfig::load(path)?;
        self.config_file = Some(path.to_path_buf());
        Ok(self)
    }

    /// Override the worker count; `None` keeps the current value
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        if let Some(threads) = threads {
            self.pipeline = self.pipeline.with_concurrency(threads);
        }
        self
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
