//! Tunable constants for the analytics pipeline.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Configuration shared by the session's analytics entry points.
///
/// All fields have defaults matching the desktop application, so a partial
/// JSON document only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of slices the chart sampler reduces a trace to.
    /// Default: 250
    pub chart_slices: usize,

    /// Length of a distance-mode split in kilometers.
    /// Default: 1.0
    pub split_distance_km: f64,

    /// Chart slices slower than this pace (min/km) are treated as
    /// stationary GPS noise and dropped.
    /// Default: 130.0
    pub max_chart_pace: f64,

    /// Number of equal index slots the incline style partitions a trace into.
    /// Default: 60
    pub incline_slots: usize,

    /// Upper incline threshold in meters of gain per hour.
    /// Default: 800.0
    pub incline_max_rate: f64,

    /// Number of color buckets per line style.
    /// Default: 20
    pub bucket_count: usize,

    /// Window size (in points) for smoothed per-point speed.
    /// Default: 4
    pub speed_window: usize,

    /// Distance excess (%) at or below which a course split rates as good.
    /// Default: 50.0
    pub efficiency_good_pct: f64,

    /// Distance excess (%) at or below which a course split rates as medium.
    /// Default: 100.0
    pub efficiency_medium_pct: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chart_slices: 250,
            split_distance_km: 1.0,
            max_chart_pace: 130.0,
            incline_slots: 60,
            incline_max_rate: 800.0,
            bucket_count: 20,
            speed_window: 4,
            efficiency_good_pct: 50.0,
            efficiency_medium_pct: 100.0,
        }
    }
}

impl AnalysisConfig {
    /// Parse a config from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
