use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// A skip entry is sampled every this many postings.
    pub skip_index_interval: usize,

    /// Terms with fewer documents than this have their score index deleted
    /// on close instead of truncated.
    pub score_index_delete_threshold: usize,

    /// Upper bound on tokens accepted from a single query string.
    pub max_query_tokens: usize,

    /// Entry count of the query result cache.
    pub query_cache_entries: usize,

    /// Worker threads used by batch ingest. `None` means one per CPU.
    pub indexing_threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            skip_index_interval: 100,
            score_index_delete_threshold: 100,
            max_query_tokens: 1024,
            query_cache_entries: 1024,
            indexing_threads: None,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
