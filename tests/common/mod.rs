//! Synthetic track builders shared by the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use track_analytics::{GeoTrace, GpsPoint, TrackPoint};

/// One kilometer of latitude on the haversine sphere, in degrees.
pub const KM_LAT: f64 = 1.0 / 111.195_080_233_532_92;

/// Install a test logger once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap()
}

/// Builder for a northbound synthetic track along the prime meridian.
pub struct SyntheticTrack {
    name: String,
    count: usize,
    spacing_km: f64,
    seconds_apart: i64,
    heartrate: Option<u32>,
    start: DateTime<Utc>,
}

impl SyntheticTrack {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            count: 5,
            spacing_km: 1.0,
            seconds_apart: 300,
            heartrate: None,
            start: start_time(),
        }
    }

    pub fn points(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn spacing_km(mut self, km: f64) -> Self {
        self.spacing_km = km;
        self
    }

    pub fn seconds_apart(mut self, seconds: i64) -> Self {
        self.seconds_apart = seconds;
        self
    }

    pub fn heartrate(mut self, bpm: u32) -> Self {
        self.heartrate = Some(bpm);
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    pub fn track_points(&self) -> Vec<TrackPoint> {
        (0..self.count)
            .map(|i| {
                let mut p = TrackPoint::new(51.0 + i as f64 * self.spacing_km * KM_LAT, 0.0, 20.0)
                    .with_timestamp(self.start + Duration::seconds(self.seconds_apart * i as i64));
                p.heartrate = self.heartrate;
                p
            })
            .collect()
    }

    pub fn build(&self) -> GeoTrace {
        GeoTrace::new(self.name.clone(), self.track_points()).unwrap()
    }
}

/// A point `km` north of the synthetic start, `offset_lon` degrees east.
pub fn along(km: f64, offset_lon: f64) -> GpsPoint {
    GpsPoint::new(51.0 + km * KM_LAT, offset_lon)
}

/// Feature collection JSON for a track, as the GPX converter produces it.
pub fn track_json(name: Option<&str>, points: &[TrackPoint]) -> String {
    let coordinates: Vec<serde_json::Value> = points
        .iter()
        .map(|p| serde_json::json!([p.longitude, p.latitude, p.elevation]))
        .collect();
    let times: Vec<Option<String>> = points
        .iter()
        .map(|p| p.timestamp.map(|t| t.to_rfc3339()))
        .collect();

    let mut properties = serde_json::json!({ "coordTimes": times });
    if points.iter().any(|p| p.heartrate.is_some()) {
        let heartrates: Vec<Option<u32>> = points.iter().map(|p| p.heartrate).collect();
        properties["heartRates"] = serde_json::json!(heartrates);
    }
    if let Some(name) = name {
        properties["name"] = serde_json::json!(name);
    }

    serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": properties,
            "geometry": { "type": "LineString", "coordinates": coordinates }
        }]
    })
    .to_string()
}
