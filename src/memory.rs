//! Memory usage summary for an instrumented instance

use serde::Serialize;

use crate::engine::MemoryStats;

/// Usage against the configured limit
///
/// `usage_pct` is `None` when the instance has no limit (absent or zero),
/// which is reported as unknown rather than treated as an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: Option<u64>,
    pub usage_pct: Option<f64>,
}

impl MemoryUsage {
    pub fn from_stats(stats: MemoryStats) -> Self {
        let usage_pct = match stats.limit_bytes {
            Some(limit) if limit > 0 => {
                let pct = stats.usage_bytes as f64 / limit as f64 * 100.0;
                Some((pct * 100.0).round() / 100.0)
            }
            _ => {
                tracing::warn!("memory limit not set or zero; usage percentage unknown");
                None
            }
        };

        Self {
            memory_usage_bytes: stats.usage_bytes,
            memory_limit_bytes: stats.limit_bytes,
            usage_pct,
        }
    }
}
