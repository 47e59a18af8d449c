//! Application config: an optional JSON file overlaid by flags and environment.

use std::path::Path;

use anyhow::{bail, Context, Result};
use ledgerstream_core::config::IngestConfig;
use ledgerstream_horizon::HorizonConfig;
use serde::{Deserialize, Serialize};

use crate::telemetry::LogConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Checkpoint key; lets several ingestors share one checkpoint file.
    #[serde(default = "default_ingestor_id")]
    pub ingestor_id: String,
    /// Save a checkpoint every N committed ledgers.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,
    #[serde(default)]
    pub horizon: Option<HorizonConfig>,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_ingestor_id() -> String { "ledgerstream".to_string() }
fn default_checkpoint_interval() -> u64 { 10 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ingestor_id: default_ingestor_id(),
            checkpoint_interval: default_checkpoint_interval(),
            horizon: None,
            ingest: IngestConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Horizon settings with `url` (from `--horizon` or the environment)
    /// taking precedence over the file.
    pub fn horizon_config(&self, url: Option<&str>) -> Result<HorizonConfig> {
        match (url, &self.horizon) {
            (Some(url), Some(file)) => Ok(HorizonConfig {
                url: url.to_string(),
                ..file.clone()
            }),
            (Some(url), None) => Ok(HorizonConfig::new(url)),
            (None, Some(file)) => Ok(file.clone()),
            (None, None) => bail!(
                "no Horizon URL: pass --horizon, set LEDGERSTREAM_HORIZON_URL or add horizon.url to the config file"
            ),
        }
    }
}
