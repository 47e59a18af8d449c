//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::types::ChainVersion;

/// Configuration for a `LedgerIngestor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Chain version tag written into every entry and pointer.
    #[serde(default)]
    pub chain_version: ChainVersion,
    /// Maximum number of ledgers being fetched/written at once.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Capacity of the ordered result feed.
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
    /// Records requested per transaction page.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

fn default_max_in_flight() -> usize { 8 }
fn default_feed_capacity() -> usize { 64 }
fn default_page_limit() -> u32 { 200 }

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chain_version: ChainVersion::default(),
            max_in_flight: default_max_in_flight(),
            feed_capacity: default_feed_capacity(),
            page_limit: default_page_limit(),
        }
    }
}

/// Configuration for an `AccountNotifier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Queue capacity of streams created through `AccountNotifier::subscribe`.
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
}

fn default_stream_capacity() -> usize { 64 }

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            stream_capacity: default_stream_capacity(),
        }
    }
}
