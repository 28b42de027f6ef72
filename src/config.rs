//! Pipeline configuration

use crate::error::{MapReduceError, MapReduceResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one map-reduce pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of pool workers; 0 runs both stages inline
    pub concurrency: usize,
}

impl PipelineConfig {
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn is_threaded(&self) -> bool {
        self.concurrency > 0
    }

    /// Parse a TOML document, e.g. `concurrency = 4`
    pub fn from_toml_str(content: &str) -> MapReduceResult<Self> {
        toml::from_str(content)
            .map_err(|e| MapReduceError::invalid_argument("config", e.to_string()))
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Ok(Self::from_toml_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_inline() {
        let config = PipelineConfig::default();
        assert_eq!(config.concurrency, 0);
        assert!(!config.is_threaded());
        assert!(config.with_concurrency(2).is_threaded());
    }

    #[test]
    fn test_parse_toml() {
        let config = PipelineConfig::from_toml_str("concurrency = 4").unwrap();
        assert_eq!(config, PipelineConfig::new(4));

        let empty = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(empty, PipelineConfig::default());

        let large = PipelineConfig::from_toml_str("concurrency = 5000").unwrap();
        assert_eq!(large.concurrency, 5000);

        let wrong_type = PipelineConfig::from_toml_str("concurrency = \"four\"").unwrap_err();
        assert!(matches!(wrong_type, MapReduceError::InvalidArgument { .. }));

        let negative = PipelineConfig::from_toml_str("concurrency = -1").unwrap_err();
        assert!(matches!(negative, MapReduceError::InvalidArgument { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "concurrency = 3").unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.concurrency, 3);

        let missing = PipelineConfig::load(Path::new("/nonexistent/pipeline.toml")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read config file"));
    }
}
