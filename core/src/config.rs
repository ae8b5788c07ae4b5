use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    classification_engine::ComplianceRule,
    error::{PipelineError, PipelineResult},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub rule: ComplianceRule,
    /// Abort the run on the first rejected record or venue. When false,
    /// clean venues are persisted and each rejection is logged.
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
}

fn default_fail_fast() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rule:      ComplianceRule::default(),
            fail_fast: default_fail_fast(),
        }
    }
}

impl PipelineConfig {
    /// Load from the data/ directory.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/config/pipeline.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        Ok(config)
    }

    /// Like `load`, but a data directory without `config/pipeline.json`
    /// falls back to the default config. A file that exists must parse and
    /// validate.
    pub fn load_or_default(data_dir: &str) -> anyhow::Result<Self> {
        if Path::new(&format!("{data_dir}/config/pipeline.json")).exists() {
            Self::load(data_dir)
        } else {
            log::info!("No config/pipeline.json in {data_dir}; using default config");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.rule.points_per_competitor <= 0 {
            return Err(PipelineError::InvalidRule {
                points_per_competitor: self.rule.points_per_competitor,
            });
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    /// Test config that keeps clean venues when others are rejected.
    pub fn lenient_test() -> Self {
        Self { fail_fast: false, ..Self::default() }
    }
}
