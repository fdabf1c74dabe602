//! Traveled prefix of a path, used to draw the part of a journey already played.

use crate::{geo_utils, GpsPoint};

/// Vertices of `points` up to `target` meters along the path.
///
/// `distances` must be the cumulative distances of `points`.
///
/// - `target <= 0`: only the first vertex (nothing traveled yet).
/// - `target >= total`: the whole path.
/// - otherwise: every vertex with `D[i] <= target`, then the interpolated point
///   at `target` unless it falls exactly on the last included vertex.
///
/// For a path of 2+ points and `target > 0` the result always has at least 2
/// points, so it can be drawn as a line.
pub fn traveled_path(points: &[GpsPoint], distances: &[f64], target: f64) -> Vec<GpsPoint> {
    let Some(&total) = distances.last() else {
        return Vec::new();
    };

    if target <= 0.0 {
        return points[..1].to_vec();
    }
    if target >= total {
        return points.to_vec();
    }

    let included = distances.partition_point(|&d| d <= target);
    let mut traveled = points[..included].to_vec();
    if distances[included - 1] < target {
        traveled.push(geo_utils::position_at_distance(points, distances, target));
    }
    traveled
}
