//! Geographic utilities: great-circle distance, path length, interpolation
//! and closest-point projection.

use geo::{Closest, ClosestPoint, Distance, Haversine, Line, Point};

use crate::GpsPoint;

/// Calculate haversine distance between two GPS points in meters
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Great-circle distance in kilometers.
pub fn distance_km(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    haversine_distance(p1, p2) / 1000.0
}

/// Total length of a polyline in kilometers.
pub fn polyline_length_km(points: &[GpsPoint]) -> f64 {
    points.windows(2).map(|w| distance_km(&w[0], &w[1])).sum()
}

/// Linearly interpolate between two points, `ratio` in [0, 1].
pub fn interpolate(p1: &GpsPoint, p2: &GpsPoint, ratio: f64) -> GpsPoint {
    GpsPoint::with_elevation(
        p1.latitude + ratio * (p2.latitude - p1.latitude),
        p1.longitude + ratio * (p2.longitude - p1.longitude),
        p1.elevation + ratio * (p2.elevation - p1.elevation),
    )
}

/// Project `target` onto the segment `start`-`end`.
///
/// Returns the projected point and its fraction along the segment.
/// Degenerate (zero-length) segments project onto `start`.
pub fn closest_point_on_segment(
    start: &GpsPoint,
    end: &GpsPoint,
    target: &GpsPoint,
) -> (GpsPoint, f64) {
    let line = Line::new(
        geo::coord! { x: start.longitude, y: start.latitude },
        geo::coord! { x: end.longitude, y: end.latitude },
    );
    let query = Point::new(target.longitude, target.latitude);

    let projected = match line.closest_point(&query) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p,
        Closest::Indeterminate => return (*start, 0.0),
    };

    let dx = end.longitude - start.longitude;
    let dy = end.latitude - start.latitude;
    let len_sq = dx * dx + dy * dy;
    let ratio = if len_sq > 0.0 {
        (((projected.x() - start.longitude) * dx + (projected.y() - start.latitude) * dy) / len_sq)
            .clamp(0.0, 1.0)
    } else {
        0.0
    };

    (interpolate(start, end, ratio), ratio)
}
