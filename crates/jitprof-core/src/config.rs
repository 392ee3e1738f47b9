//! Report limits and thresholds.

use serde::Deserialize;

/// Limits applied when the report is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Worst sites considered for the report
    pub max_sites: usize,
    /// Creation sites listed per reported site
    pub max_creation_sites: usize,
    /// Layout entries listed per reported site
    pub max_layouts: usize,
    /// A site is reported only when its misses exceed this
    pub min_misses: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            max_sites: 5,
            max_creation_sites: 5,
            max_layouts: 5,
            min_misses: 1,
        }
    }
}
