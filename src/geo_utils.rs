//! # Geographic Utilities
//!
//! Distance model used by the sampler, the correspondence mapper and the
//! playback clock.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`cumulative_distances`] | Running distance along a path, aligned with its vertices |
//! | [`position_at_distance`] | Point at a given distance along a path |
//! | [`polyline_length`] | Total length of a path in meters |
//! | [`compute_bounds`] | Bounding box of a path |
//!
//! ## Example
//!
//! ```rust
//! use journey_replay::{GpsPoint, geo_utils};
//!
//! let path = vec![
//!     GpsPoint::new(0.0, 0.0),
//!     GpsPoint::new(0.01, 0.0),
//!     GpsPoint::new(0.02, 0.0),
//! ];
//!
//! let distances = geo_utils::cumulative_distances(&path);
//! assert_eq!(distances.len(), 3);
//!
//! // Halfway along the first segment
//! let p = geo_utils::position_at_distance(&path, &distances, distances[1] / 2.0);
//! assert!((p.latitude - 0.005).abs() < 1e-9);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a spherical Earth of radius
//! [`EARTH_RADIUS_M`] (6,371,000 m). `geo` computes on its own mean radius
//! (6,371,008.8 m); results are rescaled, which is exact since haversine
//! distance is linear in the radius. Interpolation between two vertices is linear in latitude and
//! longitude. That is adequate for the short segments of a local-scale journey
//! and is not valid for long segments near the poles.

use crate::{Bounds, GpsPoint};
use geo::{Distance, Haversine, Point};

/// Mirrors geo's internal (private) mean Earth radius, in meters.
const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

/// Earth radius used for all distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in meters along the Earth's surface.
///
/// # Example
///
/// ```rust
/// use journey_replay::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2) * (EARTH_RADIUS_M / MEAN_EARTH_RADIUS)
}

/// Calculate the total length of a path in meters.
///
/// Empty or single-point paths return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Cumulative distance along a path.
///
/// The result is aligned 1:1 with `points`: `D[0] = 0` and
/// `D[i] = D[i-1] + distance(points[i-1], points[i])`, so it is monotonically
/// nondecreasing and its last element is the path length. A single-point path
/// yields `[0.0]`; an empty path yields an empty vector.
pub fn cumulative_distances(points: &[GpsPoint]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len());
    if points.is_empty() {
        return distances;
    }

    let mut total = 0.0;
    distances.push(total);
    for w in points.windows(2) {
        total += haversine_distance(&w[0], &w[1]);
        distances.push(total);
    }
    distances
}

/// Point at `target` meters along a path.
///
/// `distances` must be the [`cumulative_distances`] of `points`. The target is
/// clamped to the path: anything at or before 0 returns the first vertex, and
/// anything at or beyond the total length returns the last one. Otherwise the
/// containing segment is found by binary search and the position is linearly
/// interpolated in latitude/longitude. A zero-length segment (duplicate
/// vertices) resolves to its start vertex.
///
/// # Panics
///
/// Panics if `points` is empty.
pub fn position_at_distance(points: &[GpsPoint], distances: &[f64], target: f64) -> GpsPoint {
    debug_assert_eq!(points.len(), distances.len());

    let last = points.len() - 1;
    let total = distances[last];

    if target <= 0.0 || last == 0 {
        return points[0];
    }
    if target >= total {
        return points[last];
    }

    // Smallest i with D[i] >= target; i >= 1 because D[0] = 0 < target
    let i = distances.partition_point(|&d| d < target).max(1);

    let segment = distances[i] - distances[i - 1];
    let t = if segment > 0.0 {
        (target - distances[i - 1]) / segment
    } else {
        0.0
    };

    interpolate(&points[i - 1], &points[i], t)
}

/// Linear interpolation between two points, `t` in [0, 1].
#[inline]
pub fn interpolate(a: &GpsPoint, b: &GpsPoint, t: f64) -> GpsPoint {
    GpsPoint::new(
        a.latitude + (b.latitude - a.latitude) * t,
        a.longitude + (b.longitude - a.longitude) * t,
    )
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a path.
///
/// For empty input, returns a bounds with MIN/MAX values.
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds {
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
