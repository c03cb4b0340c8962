//! Track and course data model.
//!
//! A [`GeoTrace`] is built once per loaded file and never mutated afterwards;
//! smoothed per-point speed is derived during construction so repeated
//! re-rendering never recomputes it.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{haversine_distance, polyline_length_km};
use crate::{Bounds, GpsPoint, Result, TrackError};

/// Default number of points per speed smoothing window.
pub const DEFAULT_SPEED_WINDOW: usize = 4;

/// A single recorded point of a runner's track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: f64,
    /// Recording instant, absent when the source has no time for this point
    pub timestamp: Option<DateTime<Utc>>,
    /// Heartrate in beats per minute
    pub heartrate: Option<u32>,
    /// Smoothed speed in km/h, see [`derive_speeds`]
    pub speed: Option<f64>,
}

impl TrackPoint {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            timestamp: None,
            heartrate: None,
            speed: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_heartrate(mut self, heartrate: u32) -> Self {
        self.heartrate = Some(heartrate);
        self
    }

    /// Position of this point.
    pub fn position(&self) -> GpsPoint {
        GpsPoint::with_elevation(self.latitude, self.longitude, self.elevation)
    }
}

/// A runner's GPS track.
///
/// Invariants: at least one point, every coordinate and elevation finite,
/// point order is recording order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTrace {
    name: String,
    points: Vec<TrackPoint>,
    has_heartrate: bool,
}

impl GeoTrace {
    /// Build a trace and derive smoothed speeds with the default window.
    pub fn new(name: impl Into<String>, points: Vec<TrackPoint>) -> Result<Self> {
        Self::with_speed_window(name, points, DEFAULT_SPEED_WINDOW)
    }

    /// Build a trace, deriving smoothed speeds over `window` points.
    pub fn with_speed_window(
        name: impl Into<String>,
        mut points: Vec<TrackPoint>,
        window: usize,
    ) -> Result<Self> {
        let name = name.into();
        if points.is_empty() {
            return Err(TrackError::InvalidFeature {
                message: format!("track '{}' has no points", name),
            });
        }
        if let Some(i) = points.iter().position(|p| !p.position().is_valid()) {
            return Err(TrackError::InvalidFeature {
                message: format!("track '{}' has an invalid coordinate at point {}", name, i),
            });
        }

        // Heartrate is a property of the whole trace, not of single points
        let has_heartrate = points.iter().any(|p| p.heartrate.is_some());

        derive_speeds(&mut points, window);

        Ok(Self {
            name,
            points,
            has_heartrate,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: a trace holds at least one point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the source carried a heartrate channel.
    pub fn has_heartrate(&self) -> bool {
        self.has_heartrate
    }

    pub fn positions(&self) -> Vec<GpsPoint> {
        self.points.iter().map(TrackPoint::position).collect()
    }

    /// Box covering every point of the trace.
    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::at(&self.points[0].position());
        for point in &self.points[1..] {
            bounds.include(&point.position());
        }
        bounds
    }

    /// Final point of the trace.
    pub fn last(&self) -> &TrackPoint {
        // Non-empty by construction
        &self.points[self.points.len() - 1]
    }
}

/// A reference course: ordered checkpoint controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// `"<file stem> - <feature name>"`
    pub name: String,
    /// Controls in the order the runner is expected to pass them
    pub controls: Vec<GpsPoint>,
}

impl Course {
    pub fn new(name: impl Into<String>, controls: Vec<GpsPoint>) -> Self {
        Self {
            name: name.into(),
            controls,
        }
    }

    /// Straight-line length from control to control in kilometers.
    pub fn length(&self) -> f64 {
        polyline_length_km(&self.controls)
    }
}

/// Assign smoothed speeds (km/h) in windows of `window` points.
///
/// At every index `i` divisible by `window` (excluding 0) the speeds of the
/// `window - 1` segments ending at or before point `i - 1` are ceiling-rounded, averaged and
/// rounded, and the result is written to points `i - window + 1 ..= i`.
/// A window containing a zero or missing time delta is left without speed.
pub fn derive_speeds(points: &mut [TrackPoint], window: usize) {
    if window < 2 {
        return;
    }

    let mut i = window;
    while i < points.len() {
        let mut total = 0.0;
        let mut complete = true;

        for x in 1..window {
            let (prev, cur) = (&points[i - x - 1], &points[i - x]);
            let seconds = match (prev.timestamp, cur.timestamp) {
                (Some(t0), Some(t1)) => (t1 - t0).num_milliseconds() as f64 / 1000.0,
                _ => 0.0,
            };
            if seconds <= 0.0 {
                complete = false;
                break;
            }
            let meters = haversine_distance(&prev.position(), &cur.position());
            total += (meters / seconds * 3.6).ceil();
        }

        if complete {
            let average = (total / (window - 1) as f64).round();
            for x in 0..window {
                points[i - x].speed = Some(average);
            }
        } else {
            debug!("[Trace] Skipping speed window ending at {}: missing time delta", i);
        }

        i += window;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn timed_points(count: usize, seconds_apart: i64) -> Vec<TrackPoint> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                // ~11 m per step northwards
                TrackPoint::new(51.5 + i as f64 * 0.0001, -0.12, 10.0)
                    .with_timestamp(start + Duration::seconds(seconds_apart * i as i64))
            })
            .collect()
    }

    #[test]
    fn test_empty_trace_rejected() {
        let result = GeoTrace::new("empty", vec![]);
        assert!(matches!(result, Err(TrackError::InvalidFeature { .. })));
    }

    #[test]
    fn test_non_finite_elevation_rejected() {
        let points = vec![TrackPoint::new(51.5, -0.12, f64::NAN)];
        assert!(GeoTrace::new("bad", points).is_err());
    }

    #[test]
    fn test_heartrate_is_trace_wide() {
        let trace = GeoTrace::new("no-hr", timed_points(3, 5)).unwrap();
        assert!(!trace.has_heartrate());

        let mut points = timed_points(3, 5);
        points[1].heartrate = Some(140);
        let trace = GeoTrace::new("hr", points).unwrap();
        assert!(trace.has_heartrate());
    }

    #[test]
    fn test_speed_windows() {
        let trace = GeoTrace::new("speed", timed_points(10, 4)).unwrap();
        let points = trace.points();

        // First point never gets a speed
        assert!(points[0].speed.is_none());
        // Points 1..=8 covered by the windows ending at 4 and 8
        for p in &points[1..=8] {
            assert!(p.speed.is_some());
        }
        // Trailing point after the last full window stays unset
        assert!(points[9].speed.is_none());

        // ~11.1 m per 4 s = ~10 km/h, ceiled per segment
        let speed = points[4].speed.unwrap();
        assert!((10.0..=11.0).contains(&speed), "speed {}", speed);
        assert_eq!(points[1].speed, points[4].speed);
    }

    #[test]
    fn test_zero_time_delta_leaves_window_unset() {
        let mut points = timed_points(9, 4);
        points[2].timestamp = points[1].timestamp;
        let trace = GeoTrace::new("stalled", points).unwrap();
        let points = trace.points();

        assert!(points[1..=4].iter().all(|p| p.speed.is_none()));
        assert!(points[5..=8].iter().all(|p| p.speed.is_some()));
    }

    #[test]
    fn test_course_length() {
        let course = Course::new(
            "file - course",
            vec![GpsPoint::new(51.5, -0.12), GpsPoint::new(51.51, -0.12)],
        );
        assert!((course.length() - 1.112).abs() < 0.01);
    }

    #[test]
    fn test_bounds() {
        let trace = GeoTrace::new("speed", timed_points(10, 4)).unwrap();
        let bounds = trace.bounds();
        assert_eq!(bounds.min_lat, 51.5);
        assert!((bounds.max_lat - 51.5009).abs() < 1e-9);
        assert_eq!(bounds.min_lng, -0.12);
    }
}
