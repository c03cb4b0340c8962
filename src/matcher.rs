//! Course control matching.
//!
//! Each control of a course is matched to the nearest position on the
//! runner's path (projected onto the nearest segment, not merely the nearest
//! vertex). Segments are indexed in an R-tree so matching stays fast on long
//! traces.

use log::debug;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::geo_utils::{closest_point_on_segment, distance_km};
use crate::{GeoTrace, GpsPoint};

/// A control matched onto the runner's trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutPoint {
    /// Position of the control in the course
    pub control_index: usize,
    /// Index of the trace vertex starting the matched segment
    pub index: usize,
    /// Matched position on the trace
    pub location: GpsPoint,
    /// Distance from the trace start to `location` in km
    pub location_km: f64,
    /// Distance from the control to `location` in km
    pub distance_km: f64,
}

/// A trace segment `idx -> idx + 1` for R-tree queries, in `[lng, lat]`.
#[derive(Debug, Clone, Copy)]
struct IndexedSegment {
    idx: usize,
    from: [f64; 2],
    to: [f64; 2],
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.from, self.to)
    }
}

impl PointDistance for IndexedSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.to[0] - self.from[0];
        let dy = self.to[1] - self.from[1];
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq > 0.0 {
            (((point[0] - self.from[0]) * dx + (point[1] - self.from[1]) * dy) / len_sq)
                .clamp(0.0, 1.0)
        } else {
            0.0
        };
        let px = self.from[0] + t * dx - point[0];
        let py = self.from[1] + t * dy - point[1];
        px * px + py * py
    }
}

/// Spatial index over the segments of one trace.
pub struct SegmentIndex {
    tree: RTree<IndexedSegment>,
    positions: Vec<GpsPoint>,
    /// Distance along the trace to each vertex in km
    cumulative: Vec<f64>,
}

impl SegmentIndex {
    pub fn new(trace: &GeoTrace) -> Self {
        let positions = trace.positions();

        let mut cumulative = Vec::with_capacity(positions.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for w in positions.windows(2) {
            total += distance_km(&w[0], &w[1]);
            cumulative.push(total);
        }

        let segments: Vec<IndexedSegment> = positions
            .windows(2)
            .enumerate()
            .map(|(i, w)| IndexedSegment {
                idx: i,
                from: [w[0].longitude, w[0].latitude],
                to: [w[1].longitude, w[1].latitude],
            })
            .collect();

        Self {
            tree: RTree::bulk_load(segments),
            positions,
            cumulative,
        }
    }

    /// Nearest segment to `point`; equidistant segments resolve to the
    /// earliest one along the trace.
    fn nearest_segment(&self, point: &GpsPoint) -> Option<usize> {
        let query = [point.longitude, point.latitude];
        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&query);
        let (first, best) = candidates.next()?;

        let mut idx = first.idx;
        for (segment, d2) in candidates {
            if d2 > best {
                break;
            }
            idx = idx.min(segment.idx);
        }
        Some(idx)
    }

    /// Match a single control onto the trace.
    pub fn cut_point(&self, control_index: usize, control: &GpsPoint) -> CutPoint {
        let Some(idx) = self.nearest_segment(control) else {
            // Single-vertex trace, no segments to project onto
            let location = self.positions[0];
            return CutPoint {
                control_index,
                index: 0,
                location,
                location_km: 0.0,
                distance_km: distance_km(control, &location),
            };
        };

        let (start, end) = (&self.positions[idx], &self.positions[idx + 1]);
        let (location, _) = closest_point_on_segment(start, end, control);

        CutPoint {
            control_index,
            index: idx,
            location,
            location_km: self.cumulative[idx] + distance_km(start, &location),
            distance_km: distance_km(control, &location),
        }
    }
}

/// Match every control onto the trace, in course order.
///
/// The output always has one cut point per control, ordered like the
/// controls, even when the runner passed them out of order.
pub fn match_controls(trace: &GeoTrace, controls: &[GpsPoint]) -> Vec<CutPoint> {
    let index = SegmentIndex::new(trace);
    let cuts: Vec<CutPoint> = controls
        .iter()
        .enumerate()
        .map(|(i, control)| index.cut_point(i, control))
        .collect();

    debug!(
        "[Matcher] Matched {} controls onto '{}' ({} points)",
        cuts.len(),
        trace.name(),
        trace.len()
    );
    cuts
}
