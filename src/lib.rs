//! # Track Analytics
//!
//! Analytics engine for GPS running tracks checked against orienteering-style
//! reference courses.
//!
//! This library provides:
//! - Aggregate track metrics (time, distance, pace, speed, elevation, heartrate)
//! - Distance-based chart sampling with outlier rejection
//! - Fixed-distance and course-control splits
//! - Course matching (nearest point on the runner's path for each control)
//! - Per-segment color classification for route rendering
//! - An explicit session store and request/response protocol for UI layers
//!
//! ## Features
//!
//! - **`parallel`** - Compute session summaries in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use track_analytics::{GeoTrace, TrackMetrics, TrackPoint};
//! use chrono::{TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
//! let points: Vec<TrackPoint> = (0..5)
//!     .map(|i| {
//!         TrackPoint::new(51.5 + i as f64 * 0.009, -0.12, 10.0)
//!             .with_timestamp(start + chrono::Duration::minutes(5 * i))
//!     })
//!     .collect();
//!
//! let trace = GeoTrace::new("Morning Run", points).unwrap();
//! let metrics = TrackMetrics::new(&trace);
//! println!("{:.2} km at {}/km", metrics.length(), metrics.pace().unwrap());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackError};

// Tunable constants
pub mod config;
pub use config::AnalysisConfig;

// Geographic utilities (distance, interpolation, projection)
pub mod geo_utils;

// GeoJSON-like data contract
pub mod geojson;
pub use geojson::{Feature, FeatureCollection, Geometry, Properties};

// Track and course data model
pub mod trace;
pub use trace::{derive_speeds, Course, GeoTrace, TrackPoint};

// Aggregate statistics
pub mod metrics;
pub use metrics::{
    format_clock, format_elapsed, format_pace, CourseSummary, ElevationRange, TrackMetrics,
    TrackSummary, HEARTRATE_UNAVAILABLE,
};

// Chart resampling
pub mod chart;
pub use chart::{
    chart_series, partition, sample_chart, ChartData, ChartMetric, ChartPoint, ChartSamplePoint,
    ChartSampler,
};

// Fixed-length line chunking
pub mod chunk;
pub use chunk::{line_chunk, CHUNK_BOUNDARY_POINTS};

// Course matching
pub mod matcher;
pub use matcher::{match_controls, CutPoint, SegmentIndex};

// Split calculation
pub mod splits;
pub use splits::{course_splits, distance_splits, EfficiencyRating, Split};

// Segment classification for route coloring
pub mod styles;
pub use styles::{
    palette, segment_runs, style_trace, ClassifyState, ColoredRun, LineStyle, Rgb,
    SegmentClassifier, TrackStyling,
};

// Session store
pub mod session;
pub use session::{Overview, TrackSession};

// Request/response interface for UI layers
pub mod protocol;
pub use protocol::{Request, Response};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude, longitude and elevation.
///
/// # Example
/// ```
/// use track_analytics::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters, 0 when the source has none
    #[serde(default)]
    pub elevation: f64,
}

impl GpsPoint {
    /// Create a new GPS point at sea level.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: 0.0,
        }
    }

    /// Create a new GPS point with elevation.
    pub fn with_elevation(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.elevation.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Coordinates in GeoJSON order: [longitude, latitude, elevation].
    pub fn to_lon_lat_ele(&self) -> [f64; 3] {
        [self.longitude, self.latitude, self.elevation]
    }
}

/// Lat/lng box a map view is fitted to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Zero-area box at a single position.
    pub fn at(point: &GpsPoint) -> Self {
        Self {
            min_lat: point.latitude,
            max_lat: point.latitude,
            min_lng: point.longitude,
            max_lng: point.longitude,
        }
    }

    /// Grow the box until it covers `point`.
    pub fn include(&mut self, point: &GpsPoint) {
        self.min_lat = self.min_lat.min(point.latitude);
        self.max_lat = self.max_lat.max(point.latitude);
        self.min_lng = self.min_lng.min(point.longitude);
        self.max_lng = self.max_lng.max(point.longitude);
    }

    /// Smallest box covering every point, `None` for no points.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a GpsPoint>) -> Option<Self> {
        let mut points = points.into_iter();
        let mut bounds = Self::at(points.next()?);
        points.for_each(|p| bounds.include(p));
        Some(bounds)
    }
}
