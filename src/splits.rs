//! Split calculation.
//!
//! Two modes share one output record:
//! - distance mode cuts the trace into fixed-length chunks
//! - course mode cuts it at the controls matched by [`crate::match_controls`]

use chrono::TimeDelta;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::chunk::{line_chunk, CHUNK_BOUNDARY_POINTS};
use crate::geo_utils::distance_km;
use crate::metrics::{format_elapsed, HEARTRATE_UNAVAILABLE};
use crate::{
    AnalysisConfig, CutPoint, GeoTrace, GpsPoint, Result, TrackError, TrackMetrics, TrackPoint,
};

/// How closely a course split followed the straight line between controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EfficiencyRating {
    Good,
    Medium,
    Bad,
}

impl EfficiencyRating {
    /// Rate a distance excess in percent against the configured thresholds.
    pub fn from_efficiency(efficiency_pct: f64, config: &AnalysisConfig) -> Self {
        if efficiency_pct <= config.efficiency_good_pct {
            EfficiencyRating::Good
        } else if efficiency_pct <= config.efficiency_medium_pct {
            EfficiencyRating::Medium
        } else {
            EfficiencyRating::Bad
        }
    }
}

/// A timed section of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    /// 1-based position
    pub index: usize,
    /// Distance traveled in km
    pub distance: f64,
    pub elapsed_seconds: i64,
    /// Minutes per km, `M:SS`, or "N/A" for a zero-length split
    pub pace: String,
    /// Average bpm, absent without heartrate data
    pub heartrate: Option<u32>,
    /// Course mode only: excess of traveled over straight-line distance in %
    pub distance_efficiency: Option<f64>,
    /// Course mode only: traveled minus straight-line distance in km
    pub distance_excess_km: Option<f64>,
    pub rating: Option<EfficiencyRating>,
}

impl Split {
    fn from_points(index: usize, name: &str, points: &[TrackPoint]) -> Result<Self> {
        let metrics = TrackMetrics::from_points(name, points);
        let elapsed = metrics.total_time()?;
        let pace = match metrics.pace() {
            Ok(pace) => pace,
            Err(TrackError::DegenerateSegment { .. }) => "N/A".to_string(),
            Err(err) => return Err(err),
        };
        let heartrate = match metrics.average_heartrate() {
            HEARTRATE_UNAVAILABLE => None,
            hr => Some(hr),
        };

        Ok(Self {
            index,
            distance: metrics.length(),
            elapsed_seconds: elapsed.num_seconds(),
            pace,
            heartrate,
            distance_efficiency: None,
            distance_excess_km: None,
            rating: None,
        })
    }

    pub fn elapsed_time(&self) -> TimeDelta {
        TimeDelta::seconds(self.elapsed_seconds)
    }

    /// Elapsed time as `M:SS`.
    pub fn time_display(&self) -> String {
        format_elapsed(self.elapsed_time())
    }

    pub fn heartrate_display(&self) -> String {
        self.heartrate
            .map(|hr| hr.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }
}

fn with_position(source: &TrackPoint, position: &GpsPoint) -> TrackPoint {
    TrackPoint {
        latitude: position.latitude,
        longitude: position.longitude,
        elevation: position.elevation,
        timestamp: source.timestamp,
        heartrate: source.heartrate,
        speed: None,
    }
}

/// Cut a trace into `split_km` chunks, the last one holding the remainder.
///
/// Chunk geometry carries no timestamps, so each chunk position takes the
/// metadata of the source vertex at `cursor + offset`. The cursor advances
/// by the chunk's interior vertex count, which makes a start boundary carry
/// the vertex before the cut and an end boundary the vertex after it.
pub fn distance_splits(trace: &GeoTrace, split_km: f64) -> Result<Vec<Split>> {
    let points = trace.points();
    let last = points.len() - 1;
    let chunks = line_chunk(&trace.positions(), split_km);

    let mut splits = Vec::with_capacity(chunks.len());
    let mut cursor = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        let chunk_points: Vec<TrackPoint> = chunk
            .iter()
            .enumerate()
            .map(|(offset, position)| with_position(&points[(cursor + offset).min(last)], position))
            .collect();
        cursor += chunk.len() - CHUNK_BOUNDARY_POINTS;

        splits.push(Split::from_points(i + 1, trace.name(), &chunk_points)?);
    }

    debug!(
        "[Splits] {} distance splits of {} km for '{}'",
        splits.len(),
        split_km,
        trace.name()
    );
    Ok(splits)
}

fn trace_end(trace: &GeoTrace, control_index: usize) -> CutPoint {
    let last = trace.len() - 1;
    let location = trace.last().position();
    let location_km = TrackMetrics::new(trace).length();
    CutPoint {
        control_index,
        index: last,
        location,
        location_km,
        distance_km: 0.0,
    }
}

/// Points between two cuts: the start location, the trace vertices after
/// it up to the stop's segment, then the stop location.
///
/// Two cuts on the same vertex still yield a two-point slice, so the split
/// reads as zero time over zero distance.
fn slice_between(points: &[TrackPoint], start: &CutPoint, stop: &CutPoint) -> Vec<TrackPoint> {
    let mut slice = Vec::with_capacity(stop.index.saturating_sub(start.index) + 2);
    slice.push(with_position(&points[start.index], &start.location));
    if stop.index > start.index {
        slice.extend_from_slice(&points[start.index + 1..=stop.index]);
    }

    let stop_vertex = &points[stop.index];
    if slice.len() < 2 || stop_vertex.position() != stop.location {
        slice.push(with_position(stop_vertex, &stop.location));
    }
    slice
}

/// One split per cut point, each running to the next cut point; the last
/// split runs to the trace's final point.
///
/// A runner that passed two controls in reverse order yields a split over
/// the same stretch of trace, traversed start to finish.
pub fn course_splits(
    trace: &GeoTrace,
    cuts: &[CutPoint],
    config: &AnalysisConfig,
) -> Result<Vec<Split>> {
    let points = trace.points();
    let end = trace_end(trace, cuts.len());

    let mut splits = Vec::with_capacity(cuts.len());
    for (i, cut) in cuts.iter().enumerate() {
        let next = cuts.get(i + 1).unwrap_or(&end);
        let (start, stop) = if (next.location_km, next.index) < (cut.location_km, cut.index) {
            (next, cut)
        } else {
            (cut, next)
        };

        let slice = slice_between(points, start, stop);
        let mut split = Split::from_points(i + 1, trace.name(), &slice)?;

        let straight = distance_km(&cut.location, &next.location);
        let excess = split.distance - straight;
        split.distance_excess_km = Some(excess);
        if straight > 0.0 {
            let efficiency = 100.0 * excess / straight;
            split.distance_efficiency = Some(efficiency);
            split.rating = Some(EfficiencyRating::from_efficiency(efficiency, config));
        }
        splits.push(split);
    }

    debug!(
        "[Splits] {} course splits for '{}'",
        splits.len(),
        trace.name()
    );
    Ok(splits)
}
