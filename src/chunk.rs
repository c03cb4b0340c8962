//! Fixed-length line chunking.
//!
//! A line is cut every `segment_km` kilometers along its length. Each chunk
//! is `[start boundary, interior vertices.., end boundary]`: boundaries are
//! interpolated where a cut falls between vertices, and the first and last
//! chunks are bounded by the line's own end vertices. The final chunk holds
//! the remainder shorter than `segment_km`.
//!
//! Every chunk therefore carries exactly [`CHUNK_BOUNDARY_POINTS`] points
//! that are not source vertices in their own right, and consecutive chunks
//! share their boundary position. Callers mapping chunk positions back to
//! source vertices advance their cursor by `chunk.len() - CHUNK_BOUNDARY_POINTS`
//! per chunk.

use crate::geo_utils::{distance_km, interpolate};
use crate::GpsPoint;

/// Boundary points per chunk (one at each end).
pub const CHUNK_BOUNDARY_POINTS: usize = 2;

/// Remainders shorter than this many chunks are rounding noise, not a chunk.
const REMAINDER_EPSILON: f64 = 1e-9;

fn point_along(points: &[GpsPoint], cumulative: &[f64], target_km: f64) -> GpsPoint {
    let last = points.len() - 1;
    let k = cumulative.partition_point(|&d| d < target_km).clamp(1, last);
    let span = cumulative[k] - cumulative[k - 1];
    let ratio = if span > 0.0 {
        ((target_km - cumulative[k - 1]) / span).clamp(0.0, 1.0)
    } else {
        1.0
    };
    interpolate(&points[k - 1], &points[k], ratio)
}

/// Cut a line into chunks of `segment_km` kilometers.
///
/// A zero-length line, or a non-positive `segment_km`, yields one chunk.
pub fn line_chunk(points: &[GpsPoint], segment_km: f64) -> Vec<Vec<GpsPoint>> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;
    cumulative.push(0.0);
    for w in points.windows(2) {
        total += distance_km(&w[0], &w[1]);
        cumulative.push(total);
    }

    let last = points.len() - 1;
    let count = if total > 0.0 && segment_km > 0.0 {
        ((total / segment_km - REMAINDER_EPSILON).ceil() as usize).max(1)
    } else {
        1
    };

    let mut chunks = Vec::with_capacity(count);
    let mut next_vertex = 1;

    for c in 0..count {
        let is_last = c + 1 == count;
        let end_km = (c + 1) as f64 * segment_km;

        let mut chunk = Vec::new();
        chunk.push(if c == 0 {
            points[0]
        } else {
            point_along(points, &cumulative, c as f64 * segment_km)
        });

        while next_vertex < last && (is_last || cumulative[next_vertex] < end_km) {
            chunk.push(points[next_vertex]);
            next_vertex += 1;
        }

        chunk.push(if is_last {
            points[last]
        } else {
            point_along(points, &cumulative, end_km)
        });
        chunks.push(chunk);
    }

    chunks
}
