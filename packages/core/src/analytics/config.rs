//! Configuration for the weekly aggregation engine

use serde::{Deserialize, Serialize};

/// Tunables for windowing, sampling and the heuristic detectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub fetch: FetchConfig,
    pub latency: LatencyConfig,
    pub detectors: DetectorConfig,
    /// Number of history rows attached to a report.
    pub history_limit: usize,
}

/// Bounds on the recent-posts fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Records fetched per list slot requested.
    pub multiplier: usize,
    /// Lower bound on the recent fetch size.
    pub minimum: usize,
}

/// Configuration for time-to-first-response sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Maximum comment lookups per community, successful or not.
    pub sample_cap: usize,
}

/// Thresholds for the rising and aging detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub rising_window_hours: f64,
    /// Minimum score per hour for a post to count as rising.
    pub rising_velocity: f64,
    pub aging_min_hours: f64,
    pub aging_max_hours: f64,
}

impl FetchConfig {
    /// Number of recent records to request for the given list limits.
    pub fn recent_limit(&self, top_posts_limit: usize, unanswered_limit: usize) -> usize {
        top_posts_limit
            .max(unanswered_limit)
            .saturating_mul(self.multiplier)
            .max(self.minimum)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            latency: LatencyConfig::default(),
            detectors: DetectorConfig::default(),
            history_limit: 6,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            multiplier: 5,
            minimum: 50,
        }
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self { sample_cap: 30 }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            rising_window_hours: 48.0,
            rising_velocity: 5.0,
            aging_min_hours: 48.0,
            aging_max_hours: 120.0,
        }
    }
}
