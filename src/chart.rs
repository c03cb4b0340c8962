//! Distance-based chart sampling.
//!
//! Charts render a few hundred points rather than every GPS fix, so a trace
//! is cut into contiguous slices and each slice is reduced to one averaged
//! [`ChartSamplePoint`]. Slices that look stationary (GPS noise while
//! standing still) are dropped rather than zero-filled; consumers must
//! tolerate the resulting gaps.

use std::ops::Range;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::distance_km;
use crate::metrics::format_pace;
use crate::{AnalysisConfig, GeoTrace, Result, TrackError, TrackMetrics, TrackPoint};

/// One averaged chart sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSamplePoint {
    /// Distance covered by all retained slices so far, in km
    pub cumulative_distance: f64,
    /// Seconds from the trace start to the slice's last timed point
    pub elapsed_seconds: i64,
    /// km/h
    pub average_speed: f64,
    /// min/km
    pub average_pace: f64,
    /// `M:SS`
    pub pace_display: String,
    /// bpm, rounded to two decimals; `None` without a heartrate channel
    pub average_heartrate: Option<f64>,
    /// meters
    pub average_altitude: f64,
}

fn slice_ranges(len: usize, num_slices: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(num_slices);
    let mut start = 0;
    for remaining in (1..=num_slices).rev() {
        let take = (len - start).div_ceil(remaining);
        ranges.push(start..start + take);
        start += take;
    }
    ranges
}

/// Cut `items` into `num_slices` contiguous slices.
///
/// Each cut takes `ceil(remaining / slices_left)` items from the front, so
/// slice sizes never increase and always sum to `items.len()`. With more
/// slices than items the trailing slices are empty.
pub fn partition<T>(items: &[T], num_slices: usize) -> Vec<&[T]> {
    slice_ranges(items.len(), num_slices)
        .into_iter()
        .map(|r| &items[r])
        .collect()
}

/// Lazily evaluated chart samples of one trace.
///
/// Finite and not restartable; call [`sample_chart`] again for a fresh pass.
#[derive(Debug)]
pub struct ChartSampler<'a> {
    points: &'a [TrackPoint],
    slices: std::vec::IntoIter<Range<usize>>,
    start_time: DateTime<Utc>,
    has_heartrate: bool,
    max_pace: f64,
    cumulative_distance: f64,
}

/// Start sampling `trace` into at most `num_slices` chart points.
///
/// Fails with [`TrackError::MissingTimeData`] when the trace has fewer than
/// two timestamped points.
pub fn sample_chart(
    trace: &GeoTrace,
    num_slices: usize,
    max_pace: f64,
) -> Result<ChartSampler<'_>> {
    let metrics = TrackMetrics::new(trace);
    // Validates that at least two points carry a time
    metrics.total_time()?;
    let start_time = metrics.start_time().ok_or_else(|| TrackError::MissingTimeData {
        name: trace.name().to_string(),
        timestamped: 0,
    })?;

    Ok(ChartSampler {
        points: trace.points(),
        slices: slice_ranges(trace.len(), num_slices).into_iter(),
        start_time,
        has_heartrate: trace.has_heartrate(),
        max_pace,
        cumulative_distance: 0.0,
    })
}

impl ChartSampler<'_> {
    fn sample(&mut self, range: Range<usize>) -> Option<ChartSamplePoint> {
        let len = range.len();
        let mut heartrate_total = 0.0;
        let mut altitude_total = 0.0;
        let mut minutes = 0.0;
        let mut distance = 0.0;
        let mut elapsed_seconds = 0;

        for g in range.clone() {
            let point = &self.points[g];
            if self.has_heartrate {
                heartrate_total += point.heartrate.unwrap_or(0) as f64;
            }

            // Look back across the slice boundary so no gap is lost
            if g > 0 {
                let prev = &self.points[g - 1];
                if let (Some(t0), Some(t1)) = (prev.timestamp, point.timestamp) {
                    minutes += (t1 - t0).num_milliseconds() as f64 / 60_000.0;
                    distance += distance_km(&prev.position(), &point.position());
                    elapsed_seconds = (t1 - self.start_time).num_seconds();
                }
            }

            altitude_total += point.elevation;
        }

        let pace = minutes / distance;
        let speed = distance / minutes * 60.0;

        if !speed.is_finite() || !pace.is_finite() || pace > self.max_pace {
            debug!(
                "[Chart] Dropping slice {:?}: speed={} pace={}",
                range, speed, pace
            );
            return None;
        }

        self.cumulative_distance += distance;

        let average_heartrate = if self.has_heartrate {
            Some((heartrate_total / len as f64 * 100.0).round() / 100.0)
        } else {
            None
        };

        Some(ChartSamplePoint {
            cumulative_distance: self.cumulative_distance,
            elapsed_seconds,
            average_speed: speed,
            average_pace: pace,
            pace_display: format_pace(pace),
            average_heartrate,
            average_altitude: altitude_total / len as f64,
        })
    }
}

impl Iterator for ChartSampler<'_> {
    type Item = ChartSamplePoint;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(range) = self.slices.next() {
            if range.is_empty() {
                continue;
            }
            if let Some(sample) = self.sample(range) {
                return Some(sample);
            }
        }
        None
    }
}

/// Metric plotted by one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartMetric {
    Heartrate,
    Altitude,
    Speed,
    Pace,
}

impl ChartMetric {
    pub const ALL: [ChartMetric; 4] = [
        ChartMetric::Heartrate,
        ChartMetric::Altitude,
        ChartMetric::Speed,
        ChartMetric::Pace,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChartMetric::Heartrate => "Heartrate",
            ChartMetric::Altitude => "Altitude",
            ChartMetric::Speed => "Speed",
            ChartMetric::Pace => "Pace",
        }
    }

    fn value(&self, sample: &ChartSamplePoint) -> Option<f64> {
        match self {
            ChartMetric::Heartrate => sample.average_heartrate,
            ChartMetric::Altitude => Some(sample.average_altitude),
            ChartMetric::Speed => Some(sample.average_speed),
            ChartMetric::Pace => Some(sample.average_pace),
        }
    }
}

/// An `{x, y}` chart coordinate; `x` is cumulative distance in km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
}

/// Build the series for one metric.
///
/// A leading `{x: 0, y: first}` point makes the chart start at zero
/// distance. Metrics the trace doesn't record yield an empty series.
pub fn chart_series(samples: &[ChartSamplePoint], metric: ChartMetric) -> Vec<ChartPoint> {
    let values: Vec<ChartPoint> = samples
        .iter()
        .filter_map(|s| {
            metric.value(s).map(|y| ChartPoint {
                x: s.cumulative_distance,
                y,
            })
        })
        .collect();

    let Some(first) = values.first() else {
        return values;
    };

    let mut series = Vec::with_capacity(values.len() + 1);
    series.push(ChartPoint { x: 0.0, y: first.y });
    series.extend(values);
    series
}

/// Every chart series of a trace plus the raw samples for tooltip lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub heartrate: Vec<ChartPoint>,
    pub altitude: Vec<ChartPoint>,
    pub speed: Vec<ChartPoint>,
    pub pace: Vec<ChartPoint>,
    pub samples: Vec<ChartSamplePoint>,
}

impl ChartData {
    pub fn from_trace(trace: &GeoTrace, config: &AnalysisConfig) -> Result<Self> {
        let samples: Vec<ChartSamplePoint> =
            sample_chart(trace, config.chart_slices, config.max_chart_pace)?.collect();
        debug!(
            "[Chart] '{}': {} samples from {} points",
            trace.name(),
            samples.len(),
            trace.len()
        );

        Ok(Self {
            heartrate: chart_series(&samples, ChartMetric::Heartrate),
            altitude: chart_series(&samples, ChartMetric::Altitude),
            speed: chart_series(&samples, ChartMetric::Speed),
            pace: chart_series(&samples, ChartMetric::Pace),
            samples,
        })
    }

    pub fn series(&self, metric: ChartMetric) -> &[ChartPoint] {
        match metric {
            ChartMetric::Heartrate => &self.heartrate,
            ChartMetric::Altitude => &self.altitude,
            ChartMetric::Speed => &self.speed,
            ChartMetric::Pace => &self.pace,
        }
    }
}
