//! Trace sampling and submission for map matching.
//!
//! The matching service accepts a limited number of coordinates per request, so
//! long traces are downsampled with an even index stride that always keeps the
//! first and last point. Each sampled point gets a search radius derived from
//! its dilution of precision.
//!
//! A successful match fully replaces the stored route for the journey; a failed
//! one leaves it untouched. There is no read-modify-write step, so concurrent
//! submissions for the same journey resolve as last-write-wins.

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{JourneyError, Result};
use crate::map_matching::{MapMatcher, MatchRequest, MatchedRoute, TRANSPORT_ERROR};
use crate::store::{JourneyKey, MatchedRouteRecord, MatchedRouteStore};
use crate::trajectory::{RawTrajectory, TrajectoryPoint};

/// Coordinate limit of the map matching service.
pub const MAX_MATCH_COORDINATES: usize = 100;

/// Search radius used when a point reports no dilution of precision.
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 25.0;

/// Configuration for preparing map matching requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Maximum coordinates per request.
    /// Default: 100
    pub max_coordinates: usize,

    /// Search radius for points without a DOP reading, in meters.
    /// Default: 25.0
    pub default_search_radius_m: f64,

    /// Lower bound for DOP-derived search radii, in meters.
    /// Default: 5.0
    pub min_search_radius_m: f64,

    /// Meters of search radius per unit of DOP.
    /// Default: 10.0
    pub dop_radius_factor: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_coordinates: MAX_MATCH_COORDINATES,
            default_search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            min_search_radius_m: 5.0,
            dop_radius_factor: 10.0,
        }
    }
}

impl SamplerConfig {
    /// Search radius for one point: `max(min, dop * factor)`, or the default without DOP.
    pub fn search_radius(&self, dop: Option<f64>) -> f64 {
        match dop {
            Some(dop) => (dop * self.dop_radius_factor).max(self.min_search_radius_m),
            None => self.default_search_radius_m,
        }
    }
}

/// Indices of the raw points to send for matching.
///
/// With `n <= max` every index is kept. Otherwise exactly `max` indices are
/// picked with `round(i * (n - 1) / (max - 1))`, which starts at 0, ends at
/// `n - 1` and never decreases.
///
/// # Example
/// ```
/// use journey_replay::sample_indices;
///
/// let indices = sample_indices(250, 100);
/// assert_eq!(indices.len(), 100);
/// assert_eq!(indices[0], 0);
/// assert_eq!(indices[99], 249);
/// ```
pub fn sample_indices(n: usize, max: usize) -> Vec<usize> {
    // Both endpoints are always kept
    let max = max.max(2);
    if n <= max {
        return (0..n).collect();
    }

    let stride = (n - 1) as f64 / (max - 1) as f64;
    (0..max)
        .map(|i| ((i as f64 * stride).round() as usize).min(n - 1))
        .collect()
}

/// Outcome of a successful match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub route: MatchedRoute,
    pub confidence: f64,
    /// Points in the raw trajectory
    pub original_point_count: usize,
    /// Points sent to the matching service
    pub matched_point_count: usize,
}

/// Prepares raw traces for map matching, submits them and stores the result.
pub struct TrajectorySampler<M, S> {
    matcher: M,
    store: S,
    config: SamplerConfig,
}

impl<M: MapMatcher, S: MatchedRouteStore> TrajectorySampler<M, S> {
    /// Create a sampler with the default configuration.
    pub fn new(matcher: M, store: S) -> Self {
        Self::with_config(matcher, store, SamplerConfig::default())
    }

    pub fn with_config(matcher: M, store: S, config: SamplerConfig) -> Self {
        Self {
            matcher,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Build the request for a trajectory without submitting it.
    ///
    /// Fails with [`JourneyError::InsufficientPoints`] for fewer than 2 points.
    pub fn build_request(&self, trajectory: &RawTrajectory) -> Result<MatchRequest> {
        let n = trajectory.len();
        if n < 2 {
            return Err(JourneyError::InsufficientPoints {
                point_count: n,
                minimum_required: 2,
            });
        }

        let points = trajectory.points();
        let sampled: Vec<&TrajectoryPoint> = sample_indices(n, self.config.max_coordinates)
            .into_iter()
            .map(|i| &points[i])
            .collect();

        Ok(MatchRequest {
            coordinates: join(sampled.iter().map(|p| format!("{},{}", p.longitude, p.latitude))),
            timestamps: join(sampled.iter().map(|p| p.time.timestamp().to_string())),
            radiuses: join(
                sampled
                    .iter()
                    .map(|p| self.config.search_radius(p.dop).to_string()),
            ),
        })
    }

    /// Match a journey's trace and store the result.
    ///
    /// With fewer than 2 points this fails before any request is made. A
    /// non-`Ok` response or transport failure yields
    /// [`JourneyError::MatchFailure`] and leaves the stored route as it was.
    pub fn match_journey(&mut self, key: &JourneyKey, trajectory: &RawTrajectory) -> Result<MatchSummary> {
        let request = self.build_request(trajectory)?;
        let sampled = request.coordinate_count();

        debug!(
            "[TrajectorySampler] Matching {} with {} of {} points",
            key,
            sampled,
            trajectory.len()
        );

        let response = self.matcher.match_trace(&request).map_err(|message| {
            warn!("[TrajectorySampler] Transport failure for {}: {}", key, message);
            JourneyError::match_failure(TRANSPORT_ERROR, message)
        })?;

        let route = response.into_route().map_err(|e| {
            warn!("[TrajectorySampler] Match rejected for {}: {}", key, e);
            e
        })?;

        let confidence = route.confidence();
        self.store.save(
            key,
            MatchedRouteRecord {
                route: route.clone(),
                matched_at: Utc::now().timestamp_millis(),
            },
        )?;

        info!(
            "[TrajectorySampler] Matched {}: {} vertices, confidence {:.2}",
            key,
            route.points().len(),
            confidence
        );

        Ok(MatchSummary {
            route,
            confidence,
            original_point_count: trajectory.len(),
            matched_point_count: sampled,
        })
    }
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(";")
}
