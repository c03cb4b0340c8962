//! Aggregate statistics over a track.
//!
//! All metrics are pure functions of the points they're given, so the same
//! code serves whole traces and the sub-traces produced for splits.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::geo_utils::distance_km;
use crate::{Course, GeoTrace, OptionExt, Result, TrackError, TrackPoint};

/// Sentinel returned by [`TrackMetrics::average_heartrate`] when the trace
/// has no heartrate channel. Render as "N/A", never as a reading.
pub const HEARTRATE_UNAVAILABLE: u32 = 0;

const KM_PER_MILE: f64 = 1.609_344;

/// Lowest, highest and net elevation of a track in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationRange {
    pub min: f64,
    pub max: f64,
    pub net_diff: f64,
}

/// Metric calculator over a run of track points.
#[derive(Debug, Clone, Copy)]
pub struct TrackMetrics<'a> {
    name: &'a str,
    points: &'a [TrackPoint],
    has_heartrate: bool,
}

impl<'a> TrackMetrics<'a> {
    pub fn new(trace: &'a GeoTrace) -> Self {
        Self {
            name: trace.name(),
            points: trace.points(),
            has_heartrate: trace.has_heartrate(),
        }
    }

    /// Metrics over an arbitrary run of points, e.g. one split.
    pub fn from_points(name: &'a str, points: &'a [TrackPoint]) -> Self {
        Self {
            name,
            points,
            has_heartrate: points.iter().any(|p| p.heartrate.is_some()),
        }
    }

    pub fn has_heartrate(&self) -> bool {
        self.has_heartrate
    }

    fn timestamped_count(&self) -> usize {
        self.points.iter().filter(|p| p.timestamp.is_some()).count()
    }

    /// First recorded instant.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.points.iter().find_map(|p| p.timestamp)
    }

    /// Last recorded instant. Trailing points without a time are skipped.
    pub fn finish_time(&self) -> Option<DateTime<Utc>> {
        self.points.iter().rev().find_map(|p| p.timestamp)
    }

    /// Finish minus start.
    pub fn total_time(&self) -> Result<TimeDelta> {
        let timestamped = self.timestamped_count();
        if timestamped < 2 {
            return Err(TrackError::MissingTimeData {
                name: self.name.to_string(),
                timestamped,
            });
        }
        let start = self.start_time().ok_or_missing_time(self.name, timestamped)?;
        let finish = self.finish_time().ok_or_missing_time(self.name, timestamped)?;
        Ok(finish - start)
    }

    /// Sum of great-circle distances between consecutive points, in km.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| distance_km(&w[0].position(), &w[1].position()))
            .sum()
    }

    pub fn length_miles(&self) -> f64 {
        self.length() / KM_PER_MILE
    }

    /// Average pace in minutes per kilometer.
    pub fn pace_minutes(&self) -> Result<f64> {
        let minutes = self.total_time()?.num_milliseconds() as f64 / 60_000.0;
        let length = self.length();
        if length <= 0.0 {
            return Err(TrackError::DegenerateSegment { quantity: "pace" });
        }
        Ok(minutes / length)
    }

    /// Average pace formatted as `M:SS`.
    pub fn pace(&self) -> Result<String> {
        Ok(format_pace(self.pace_minutes()?))
    }

    /// Average speed in km/h.
    pub fn speed(&self) -> Result<f64> {
        let hours = self.total_time()?.num_milliseconds() as f64 / 3_600_000.0;
        if hours <= 0.0 {
            return Err(TrackError::DegenerateSegment { quantity: "speed" });
        }
        Ok(self.length() / hours)
    }

    /// Lowest and highest elevation, scanned once.
    pub fn elevation_range(&self) -> ElevationRange {
        let first = self.points.first().map(|p| p.elevation).unwrap_or(0.0);
        let (min, max) = self
            .points
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.min(p.elevation), hi.max(p.elevation)));
        ElevationRange {
            min,
            max,
            net_diff: max - min,
        }
    }

    /// Lowest and highest heartrate, `None` without a heartrate channel.
    pub fn heartrate_range(&self) -> Option<(u32, u32)> {
        let mut rates = self.points.iter().filter_map(|p| p.heartrate);
        let first = rates.next()?;
        Some(rates.fold((first, first), |(lo, hi), hr| (lo.min(hr), hi.max(hr))))
    }

    pub fn min_heartrate(&self) -> Option<u32> {
        self.heartrate_range().map(|(lo, _)| lo)
    }

    pub fn max_heartrate(&self) -> Option<u32> {
        self.heartrate_range().map(|(_, hi)| hi)
    }

    /// Rounded mean heartrate, or [`HEARTRATE_UNAVAILABLE`].
    pub fn average_heartrate(&self) -> u32 {
        if !self.has_heartrate {
            return HEARTRATE_UNAVAILABLE;
        }
        let (sum, count) = self
            .points
            .iter()
            .filter_map(|p| p.heartrate)
            .fold((0u64, 0u64), |(sum, count), hr| (sum + hr as u64, count + 1));
        if count == 0 {
            return HEARTRATE_UNAVAILABLE;
        }
        (sum as f64 / count as f64).round() as u32
    }
}

/// Format minutes per km as `M:SS`, seconds rounded on a base of 60.
///
/// `format_pace(5.5) == "5:30"`
pub fn format_pace(minutes: f64) -> String {
    if !minutes.is_finite() || minutes < 0.0 {
        return "N/A".to_string();
    }
    let total_seconds = (minutes * 60.0).round() as u64;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Format a duration as `H:MM:SS`.
pub fn format_clock(duration: TimeDelta) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Format a duration as `M:SS`, minutes unpadded.
pub fn format_elapsed(duration: TimeDelta) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Display-ready overview of a track. Unavailable values read "N/A".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub name: String,
    pub time: String,
    pub pace: String,
    pub speed: String,
    pub distance: String,
    pub elevation: String,
    pub heartrate: String,
}

impl TrackSummary {
    pub fn from_trace(trace: &GeoTrace) -> Self {
        let metrics = TrackMetrics::new(trace);
        let na = || "N/A".to_string();

        let heartrate = match metrics.average_heartrate() {
            HEARTRATE_UNAVAILABLE => na(),
            hr => format!("{}bpm", hr),
        };

        Self {
            name: trace.name().to_string(),
            time: metrics.total_time().map(format_clock).unwrap_or_else(|_| na()),
            pace: metrics
                .pace()
                .map(|p| format!("{}/km", p))
                .unwrap_or_else(|_| na()),
            speed: metrics
                .speed()
                .map(|s| format!("{:.2}km/h", s))
                .unwrap_or_else(|_| na()),
            distance: format!("{:.2}km", metrics.length()),
            elevation: format!("{:.1}m", metrics.elevation_range().net_diff),
            heartrate,
        }
    }
}

/// Display-ready overview of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub name: String,
    pub distance: String,
    pub controls: usize,
}

impl CourseSummary {
    pub fn from_course(course: &Course) -> Self {
        Self {
            name: course.name.clone(),
            distance: format!("{:.2}km", course.length()),
            controls: course.controls.len(),
        }
    }
}
