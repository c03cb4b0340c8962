//! Route coloring.
//!
//! Each point of a trace is classified into one of a fixed number of color
//! buckets by the active [`LineStyle`]; consecutive points sharing a bucket
//! are drawn as one polyline ([`segment_runs`]).
//!
//! ## Example
//! ```rust
//! use track_analytics::{style_trace, AnalysisConfig, GeoTrace, LineStyle, TrackPoint};
//!
//! let points = (0..10)
//!     .map(|i| TrackPoint::new(51.0 + i as f64 * 0.001, 0.0, 40.0 + i as f64))
//!     .collect();
//! let trace = GeoTrace::new("hill", points).unwrap();
//! let styling = style_trace(&trace, LineStyle::Altitude, &AnalysisConfig::default());
//! assert_eq!(styling.buckets.len(), 10);
//! ```

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{AnalysisConfig, GeoTrace, TrackError, TrackPoint};

/// Bucket used when an incline rate is undefined (no elapsed time).
const NEUTRAL_INCLINE_BUCKET: usize = 4;

/// Lowest heartrate zone ceiling in bpm.
const HEARTRATE_ZONE_START: u32 = 90;
/// Width of one heartrate zone in bpm.
const HEARTRATE_ZONE_WIDTH: u32 = 5;

/// Margin added below and above the observed altitude range, in meters.
const ALTITUDE_MARGIN: f64 = 10.0;

const DEFAULT_BUCKETS: usize = 20;

// ============================================================================
// Line styles
// ============================================================================

/// Metric a route is colored by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineStyle {
    /// Elevation gain rate over 60 equal index slots
    Incline,
    /// Absolute elevation
    Altitude,
    /// 5 bpm heartrate zones
    Heartrate,
    /// One color for the whole track
    Solid,
    /// Smoothed speed in km/h
    #[default]
    Speed,
}

impl LineStyle {
    pub const ALL: [LineStyle; 5] = [
        LineStyle::Incline,
        LineStyle::Altitude,
        LineStyle::Heartrate,
        LineStyle::Solid,
        LineStyle::Speed,
    ];

    /// Display name, as shown in the style menu.
    pub fn name(&self) -> &'static str {
        match self {
            LineStyle::Incline => "Clustered Incline",
            LineStyle::Altitude => "Altitude",
            LineStyle::Heartrate => "Heartrate",
            LineStyle::Solid => "Solid fill",
            LineStyle::Speed => "Speed",
        }
    }
}

impl fmt::Display for LineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LineStyle {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LineStyle::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TrackError::InvalidFeature {
                message: format!("unknown line style '{}'", s),
            })
    }
}

// ============================================================================
// Palettes
// ============================================================================

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// ColorBrewer RdYlBu, blue (low) to red (high)
const RD_YL_BU: [Rgb; 11] = [
    Rgb::new(0x31, 0x36, 0x95),
    Rgb::new(0x45, 0x75, 0xb4),
    Rgb::new(0x74, 0xad, 0xd1),
    Rgb::new(0xab, 0xd9, 0xe9),
    Rgb::new(0xe0, 0xf3, 0xf8),
    Rgb::new(0xff, 0xff, 0xbf),
    Rgb::new(0xfe, 0xe0, 0x90),
    Rgb::new(0xfd, 0xae, 0x61),
    Rgb::new(0xf4, 0x6d, 0x43),
    Rgb::new(0xd7, 0x30, 0x27),
    Rgb::new(0xa5, 0x00, 0x26),
];

// Cream (low) to dark red (high)
const ALTITUDE_STOPS: [Rgb; 3] = [
    Rgb::new(0xff, 0xf7, 0xec),
    Rgb::new(0xfc, 0x8d, 0x59),
    Rgb::new(0x7f, 0x00, 0x00),
];

static RD_YL_BU_DEFAULT: Lazy<Vec<Rgb>> = Lazy::new(|| scale(&RD_YL_BU, DEFAULT_BUCKETS));
static ALTITUDE_DEFAULT: Lazy<Vec<Rgb>> = Lazy::new(|| scale(&ALTITUDE_STOPS, DEFAULT_BUCKETS));

/// Sample `count` evenly spaced colors along a piecewise-linear gradient.
fn scale(stops: &[Rgb], count: usize) -> Vec<Rgb> {
    let segments = (stops.len() - 1) as f64;
    let lerp = |a: u8, b: u8, t: f64| (a as f64 + (b as f64 - a as f64) * t).round() as u8;

    (0..count)
        .map(|i| {
            let t = if count > 1 {
                i as f64 / (count - 1) as f64
            } else {
                0.0
            };
            let pos = t * segments;
            let k = (pos.floor() as usize).min(stops.len() - 2);
            let local = pos - k as f64;
            let (a, b) = (stops[k], stops[k + 1]);
            Rgb::new(lerp(a.r, b.r, local), lerp(a.g, b.g, local), lerp(a.b, b.b, local))
        })
        .collect()
}

/// Stable color for a solid-filled track (FNV-1a of its name).
fn name_color(name: &str) -> Rgb {
    let hash = name
        .bytes()
        .fold(0x811c_9dc5_u32, |h, byte| (h ^ byte as u32).wrapping_mul(0x0100_0193));
    Rgb::new((hash >> 16) as u8, (hash >> 8) as u8, hash as u8)
}

/// Colors of a style, index 0 being the low end of the metric.
///
/// The solid style has a single color derived from the track name.
pub fn palette(style: LineStyle, track_name: &str, count: usize) -> Vec<Rgb> {
    match style {
        LineStyle::Solid => vec![name_color(track_name)],
        LineStyle::Altitude if count == DEFAULT_BUCKETS => ALTITUDE_DEFAULT.clone(),
        LineStyle::Altitude => scale(&ALTITUDE_STOPS, count),
        _ if count == DEFAULT_BUCKETS => RD_YL_BU_DEFAULT.clone(),
        _ => scale(&RD_YL_BU, count),
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Per-pass state threaded through [`SegmentClassifier::classify`].
///
/// Start a fresh state for every pass over a trace.
#[derive(Debug, Clone, Default)]
pub struct ClassifyState {
    /// Incline slot classified last, and its bucket
    last_slot: Option<(usize, usize)>,
    /// Observed (min, max) elevation of the trace
    altitude_range: Option<(f64, f64)>,
    /// Speed carried forward onto points without one
    last_speed: f64,
}

/// Maps track points to color buckets for one line style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentClassifier {
    pub style: LineStyle,
    /// Number of incline slots
    pub slots: usize,
    /// Incline rate (m/h) of the top threshold
    pub max_rate: f64,
    /// Number of color buckets
    pub buckets: usize,
}

impl SegmentClassifier {
    pub fn new(style: LineStyle, config: &AnalysisConfig) -> Self {
        Self {
            style,
            slots: config.incline_slots.max(1),
            max_rate: config.incline_max_rate,
            buckets: config.bucket_count.max(1),
        }
    }

    /// Bucket of `points[index]`, always below `self.buckets`.
    pub fn classify(
        &self,
        point: &TrackPoint,
        prev: Option<&TrackPoint>,
        index: usize,
        points: &[TrackPoint],
        state: &mut ClassifyState,
    ) -> usize {
        let bucket = match self.style {
            LineStyle::Incline => self.incline_bucket(index, points, state),
            LineStyle::Altitude => self.altitude_bucket(point, points, state),
            LineStyle::Heartrate => self.heartrate_bucket(point),
            LineStyle::Speed => {
                let speed = match point.speed {
                    Some(s) if s > 0.0 => s,
                    _ => prev.map(|_| state.last_speed).unwrap_or(0.0),
                };
                state.last_speed = speed;
                speed.max(0.0) as usize
            }
            LineStyle::Solid => 0,
        };
        bucket.min(self.buckets - 1)
    }

    fn incline_bucket(
        &self,
        index: usize,
        points: &[TrackPoint],
        state: &mut ClassifyState,
    ) -> usize {
        let slot_size = (points.len() / self.slots).max(1);
        let slot = index / slot_size;
        if let Some((cached, bucket)) = state.last_slot {
            if cached == slot {
                return bucket;
            }
        }

        let start = slot * slot_size;
        let end = (start + slot_size).min(points.len()) - 1;
        let gain: f64 = points[start..=end]
            .windows(2)
            .map(|w| (w[1].elevation - w[0].elevation).max(0.0))
            .sum();
        let seconds = match (points[start].timestamp, points[end].timestamp) {
            (Some(t0), Some(t1)) => (t1 - t0).num_milliseconds() as f64 / 1000.0,
            _ => f64::NAN,
        };
        let rate = 3600.0 * gain / seconds;

        let bucket = if rate.is_finite() {
            let step = self.max_rate / self.buckets as f64;
            (0..=self.buckets)
                .position(|i| rate <= i as f64 * step)
                .unwrap_or(self.buckets + 1)
        } else {
            NEUTRAL_INCLINE_BUCKET
        };

        state.last_slot = Some((slot, bucket));
        bucket
    }

    fn altitude_bucket(
        &self,
        point: &TrackPoint,
        points: &[TrackPoint],
        state: &mut ClassifyState,
    ) -> usize {
        // No elevation recorded
        if point.elevation == 0.0 {
            return 0;
        }

        let (min, max) = *state.altitude_range.get_or_insert_with(|| {
            points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.elevation), hi.max(p.elevation))
            })
        });
        let lower = min - ALTITUDE_MARGIN;
        let step = (max + ALTITUDE_MARGIN - lower) / self.buckets as f64;

        (0..self.buckets)
            .position(|i| point.elevation <= lower + i as f64 * step)
            .unwrap_or(self.buckets)
    }

    fn heartrate_bucket(&self, point: &TrackPoint) -> usize {
        let hr = match point.heartrate {
            Some(hr) if hr > 0 => hr,
            _ => return 0,
        };
        (0..self.buckets)
            .position(|i| hr <= HEARTRATE_ZONE_START + i as u32 * HEARTRATE_ZONE_WIDTH)
            .unwrap_or(self.buckets)
    }
}

// ============================================================================
// Colored runs
// ============================================================================

/// Consecutive points `start..=end` drawn in one color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColoredRun {
    pub bucket: usize,
    pub start: usize,
    pub end: usize,
}

/// Split per-point buckets into polylines of one color each.
///
/// A run ends at the first point whose bucket differs, and that point also
/// starts the next run, so the drawn line has no gaps. The last run always
/// ends at the final point. Fewer than two points draw nothing.
pub fn segment_runs(buckets: &[usize]) -> Vec<ColoredRun> {
    let mut runs = Vec::new();
    let Some(&first) = buckets.first() else {
        return runs;
    };

    let last = buckets.len() - 1;
    let (mut start, mut current) = (0, first);
    for (i, &bucket) in buckets.iter().enumerate().skip(1) {
        if bucket != current || i == last {
            runs.push(ColoredRun {
                bucket: current,
                start,
                end: i,
            });
            start = i;
            current = bucket;
        }
    }
    runs
}

/// Everything a renderer needs to draw one track in one style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackStyling {
    pub track: String,
    pub style: LineStyle,
    /// `#rrggbb` per bucket
    pub colors: Vec<String>,
    /// Bucket per point
    pub buckets: Vec<usize>,
    pub runs: Vec<ColoredRun>,
}

/// Classify every point of a trace and group them into colored runs.
pub fn style_trace(trace: &GeoTrace, style: LineStyle, config: &AnalysisConfig) -> TrackStyling {
    let classifier = SegmentClassifier::new(style, config);
    let points = trace.points();
    let mut state = ClassifyState::default();

    let buckets: Vec<usize> = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let prev = i.checked_sub(1).map(|p| &points[p]);
            classifier.classify(point, prev, i, points, &mut state)
        })
        .collect();

    let colors = palette(style, trace.name(), classifier.buckets)
        .iter()
        .map(Rgb::to_hex)
        .collect();

    TrackStyling {
        track: trace.name().to_string(),
        style,
        colors,
        runs: segment_runs(&buckets),
        buckets,
    }
}
