//! GeoJSON-like data contract between the GPX conversion layer and the core.
//!
//! Tracks arrive as a feature collection whose first feature is a
//! `LineString` of `[lon, lat, elevation]` triples, with optional parallel
//! `coordTimes` (ISO-8601) and `heartRates` arrays in its properties.
//! Course files may hold several features; only line strings are courses,
//! the remaining point features duplicate their vertices as controls.

use std::path::Path;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::trace::DEFAULT_SPEED_WINDOW;
use crate::{Course, GeoTrace, GpsPoint, OptionExt, Result, TrackError, TrackPoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Properties,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Vec<f64>),
    LineString(Vec<Vec<f64>>),
    MultiLineString(Vec<Vec<Vec<f64>>>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coord_times: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rates: Option<Vec<Option<u32>>>,
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: feature_collection_type(),
            features,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Feature {
    pub fn new(properties: Properties, geometry: Geometry) -> Self {
        Self {
            kind: feature_type(),
            properties,
            geometry,
        }
    }
}

/// File name without directory or extension, used as a fallback name.
///
/// `file_stem("/runs/Morning Run.gpx") == "Morning Run"`
pub fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn to_gps_point(coords: &[f64]) -> Result<GpsPoint> {
    match coords {
        [lon, lat] => Ok(GpsPoint::new(*lat, *lon)),
        [lon, lat, ele, ..] => Ok(GpsPoint::with_elevation(*lat, *lon, *ele)),
        _ => Err(TrackError::InvalidFeature {
            message: format!("coordinate has {} values, at least 2 required", coords.len()),
        }),
    }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(err) => {
            warn!("[Trace] Ignoring unparseable timestamp '{}': {}", raw, err);
            None
        }
    }
}

fn line_coordinates(geometry: &Geometry) -> Option<Vec<&[f64]>> {
    match geometry {
        Geometry::LineString(coords) => Some(coords.iter().map(Vec::as_slice).collect()),
        Geometry::MultiLineString(lines) => Some(
            lines
                .iter()
                .flat_map(|line| line.iter().map(Vec::as_slice))
                .collect(),
        ),
        Geometry::Point(_) => None,
    }
}

impl GeoTrace {
    /// Build a trace from the first feature of a converted GPX file.
    ///
    /// `fallback_name` is used when the feature carries no name, typically
    /// the [`file_stem`] of the source path.
    pub fn from_feature_collection(
        collection: &FeatureCollection,
        fallback_name: &str,
    ) -> Result<Self> {
        Self::from_feature_collection_with_window(collection, fallback_name, DEFAULT_SPEED_WINDOW)
    }

    /// Like [`GeoTrace::from_feature_collection`], smoothing speed over
    /// `window` points.
    pub fn from_feature_collection_with_window(
        collection: &FeatureCollection,
        fallback_name: &str,
        window: usize,
    ) -> Result<Self> {
        let feature = collection
            .features
            .first()
            .ok_or_invalid("feature collection has no features")?;
        Self::from_feature(feature, fallback_name, window)
    }

    pub fn from_feature(feature: &Feature, fallback_name: &str, window: usize) -> Result<Self> {
        let coords = line_coordinates(&feature.geometry)
            .ok_or_invalid("track feature is not a line string")?;
        let props = &feature.properties;

        if let Some(times) = &props.coord_times {
            if times.len() > coords.len() {
                return Err(TrackError::InvalidFeature {
                    message: format!(
                        "{} coordinate times for {} coordinates",
                        times.len(),
                        coords.len()
                    ),
                });
            }
        }

        let points = coords
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let position = to_gps_point(c)?;
                let mut point =
                    TrackPoint::new(position.latitude, position.longitude, position.elevation);
                point.timestamp = props
                    .coord_times
                    .as_ref()
                    .and_then(|t| t.get(i).cloned().flatten())
                    .and_then(|raw| parse_time(&raw));
                point.heartrate = props
                    .heart_rates
                    .as_ref()
                    .and_then(|hr| hr.get(i).copied().flatten());
                Ok(point)
            })
            .collect::<Result<Vec<_>>>()?;

        let name = props
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        GeoTrace::with_speed_window(name, points, window)
    }

    /// Serialize back into the feature collection shape used by the
    /// messaging boundary.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let points = self.points();
        let coordinates = points
            .iter()
            .map(|p| p.position().to_lon_lat_ele().to_vec())
            .collect();

        let coord_times = if points.iter().any(|p| p.timestamp.is_some()) {
            Some(
                points
                    .iter()
                    .map(|p| p.timestamp.map(|t| t.to_rfc3339()))
                    .collect(),
            )
        } else {
            None
        };
        let heart_rates = if self.has_heartrate() {
            Some(points.iter().map(|p| p.heartrate).collect())
        } else {
            None
        };

        FeatureCollection::new(vec![Feature::new(
            Properties {
                name: Some(self.name().to_string()),
                coord_times,
                heart_rates,
            },
            Geometry::LineString(coordinates),
        )])
    }
}

impl Course {
    /// Extract every line-string feature of a course file as a course.
    ///
    /// Names are prefixed with the file stem so same-named features from
    /// different files stay distinct.
    pub fn from_feature_collection(
        collection: &FeatureCollection,
        file_stem: &str,
    ) -> Result<Vec<Self>> {
        let mut courses = Vec::new();
        for feature in &collection.features {
            let Some(coords) = line_coordinates(&feature.geometry) else {
                continue;
            };
            let controls = coords
                .iter()
                .map(|c| to_gps_point(c))
                .collect::<Result<Vec<_>>>()?;
            let feature_name = feature.properties.name.as_deref().unwrap_or_default();
            courses.push(Course::new(
                format!("{} - {}", file_stem, feature_name),
                controls,
            ));
        }
        Ok(courses)
    }

    /// Serialize as a single line-string feature.
    pub fn to_feature(&self) -> Feature {
        Feature::new(
            Properties {
                name: Some(self.name.clone()),
                ..Properties::default()
            },
            Geometry::LineString(
                self.controls
                    .iter()
                    .map(|c| c.to_lon_lat_ele().to_vec())
                    .collect(),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_JSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {
                "name": "Morning Run",
                "coordTimes": ["2024-05-01T07:00:00Z", "2024-05-01T08:00:05+01:00", null],
                "heartRates": [120, 130, null]
            },
            "geometry": {
                "type": "LineString",
                "coordinates": [[-0.12, 51.5, 10.0], [-0.12, 51.501, 12.5], [-0.12, 51.502]]
            }
        }]
    }"#;

    #[test]
    fn test_parse_track() {
        let fc = FeatureCollection::from_json(TRACK_JSON).unwrap();
        let trace = GeoTrace::from_feature_collection(&fc, "fallback").unwrap();

        assert_eq!(trace.name(), "Morning Run");
        assert_eq!(trace.len(), 3);
        assert!(trace.has_heartrate());

        let points = trace.points();
        assert_eq!(points[2].elevation, 0.0);
        assert_eq!(points[1].heartrate, Some(130));
        assert!(points[2].timestamp.is_none());
        // +01:00 offset normalizes to UTC
        let elapsed = points[1].timestamp.unwrap() - points[0].timestamp.unwrap();
        assert_eq!(elapsed.num_seconds(), 5);
    }

    #[test]
    fn test_fallback_name() {
        let json = r#"{"type": "FeatureCollection", "features": [{"type": "Feature",
            "properties": {}, "geometry": {"type": "LineString", "coordinates": [[0.0, 51.0, 1.0]]}}]}"#;
        let fc = FeatureCollection::from_json(json).unwrap();
        let trace =
            GeoTrace::from_feature_collection(&fc, &file_stem("/runs/Evening.gpx")).unwrap();
        assert_eq!(trace.name(), "Evening");
    }

    #[test]
    fn test_point_feature_is_not_a_track() {
        let fc = FeatureCollection::new(vec![Feature::new(
            Properties::default(),
            Geometry::Point(vec![0.0, 51.0]),
        )]);
        assert!(GeoTrace::from_feature_collection(&fc, "x").is_err());
        assert!(GeoTrace::from_feature_collection(&FeatureCollection::new(vec![]), "x").is_err());
    }

    #[test]
    fn test_courses_skip_points_and_prefix_names() {
        let fc = FeatureCollection::new(vec![
            Feature::new(
                Properties {
                    name: Some("Long".to_string()),
                    ..Properties::default()
                },
                Geometry::LineString(vec![vec![0.0, 51.0], vec![0.01, 51.0]]),
            ),
            Feature::new(Properties::default(), Geometry::Point(vec![0.0, 51.0])),
        ]);
        let courses = Course::from_feature_collection(&fc, "event").unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].name, "event - Long");
        assert_eq!(courses[0].controls.len(), 2);
    }

    #[test]
    fn test_feature_collection_round_trip_shape() {
        let fc = FeatureCollection::from_json(TRACK_JSON).unwrap();
        let trace = GeoTrace::from_feature_collection(&fc, "fallback").unwrap();
        let out = trace.to_feature_collection();
        let json = serde_json::to_value(&out).unwrap();

        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["geometry"]["type"], "LineString");
        assert_eq!(json["features"][0]["properties"]["heartRates"][2], serde_json::Value::Null);
        assert_eq!(
            json["features"][0]["geometry"]["coordinates"][1][2],
            serde_json::json!(12.5)
        );
    }
}
