//! Correspondence between a raw trace and its matched route.
//!
//! The matching service may resample, reroute or change the vertex density of
//! a trace, so there is no index-to-index mapping between the two geometries.
//! Progress is carried across as a fraction of total length instead: a raw
//! progress distance `r` maps to `r / total_raw * total_matched` on the matched
//! route. Both ends line up exactly.
//!
//! This is an approximation. When the matched route takes a meaningfully
//! different shape than the raw trace (a large detour, say) the displayed
//! position drifts from where the device actually was. Fixing that needs
//! per-point correspondence from the matching service, which it does not
//! provide.

use crate::{geo_utils, GpsPoint};

/// A path together with its cumulative distances.
#[derive(Debug, Clone, PartialEq)]
pub struct PathProfile {
    points: Vec<GpsPoint>,
    distances: Vec<f64>,
}

impl PathProfile {
    /// Compute the cumulative distances of `points`.
    ///
    /// # Panics
    ///
    /// Panics if `points` is empty.
    pub fn new(points: Vec<GpsPoint>) -> Self {
        assert!(!points.is_empty(), "a path profile needs at least one point");
        let distances = geo_utils::cumulative_distances(&points);
        Self { points, distances }
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.points
    }

    /// Cumulative distance at each vertex.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Path length in meters.
    pub fn total(&self) -> f64 {
        self.distances[self.distances.len() - 1]
    }

    /// Point `distance` meters along the path, clamped to its ends.
    pub fn position_at(&self, distance: f64) -> GpsPoint {
        geo_utils::position_at_distance(&self.points, &self.distances, distance)
    }
}

/// Maps raw-trace progress to a display position on either geometry.
#[derive(Debug, Clone)]
pub struct CorrespondenceMapper {
    raw: PathProfile,
    matched: Option<PathProfile>,
    show_matched: bool,
}

impl CorrespondenceMapper {
    /// Matched display starts enabled whenever a matched route is given.
    pub fn new(raw: PathProfile, matched: Option<PathProfile>) -> Self {
        Self {
            raw,
            matched,
            show_matched: true,
        }
    }

    pub fn raw(&self) -> &PathProfile {
        &self.raw
    }

    pub fn matched(&self) -> Option<&PathProfile> {
        self.matched.as_ref()
    }

    pub fn set_show_matched(&mut self, show: bool) {
        self.show_matched = show;
    }

    pub fn show_matched(&self) -> bool {
        self.show_matched
    }

    /// The matched route when it is both available and switched on.
    pub fn displayed_matched(&self) -> Option<&PathProfile> {
        self.matched.as_ref().filter(|_| self.show_matched)
    }

    /// Progress distance on the matched route corresponding to raw progress `r`.
    ///
    /// Returns `None` when no matched route is available.
    pub fn matched_distance(&self, raw_distance: f64) -> Option<f64> {
        let matched = self.matched.as_ref()?;
        let total_raw = self.raw.total();
        let fraction = if total_raw > 0.0 {
            raw_distance / total_raw
        } else {
            0.0
        };
        Some(fraction * matched.total())
    }

    /// Display position for raw progress `r`.
    ///
    /// Uses the matched route when it is displayed, the raw trace otherwise.
    pub fn position(&self, raw_distance: f64) -> GpsPoint {
        match (self.displayed_matched(), self.matched_distance(raw_distance)) {
            (Some(matched), Some(m)) => matched.position_at(m),
            _ => self.raw.position_at(raw_distance),
        }
    }
}
