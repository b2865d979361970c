use chrono::{DateTime, Utc};

use crate::query::cache::CacheStats;

/// Point-in-time snapshot of engine activity.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub query_count: u64,
    pub write_count: u64,
    pub cache: CacheStats,
}

impl EngineStats {
    pub fn queries_per_second(&self) -> f64 {
        if self.uptime_secs == 0 {
            return self.query_count as f64;
        }
        self.query_count as f64 / self.uptime_secs as f64
    }
}
