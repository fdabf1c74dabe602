//! Map matching service boundary.
//!
//! The external service snaps a sampled trace onto the road network. This
//! module defines the request it receives, the response it returns, the
//! [`MapMatcher`] trait the sampler calls through, and the validated
//! [`MatchedRoute`] extracted from a successful response.

use serde::{Deserialize, Serialize};

use crate::error::{JourneyError, Result};
use crate::{geo_utils, GpsPoint};

/// Response code signalling a successful match.
pub const MATCH_OK: &str = "Ok";

/// Failure code for an `Ok` response that carries no matchings.
pub const NO_MATCHINGS: &str = "NoMatchings";

/// Failure code for an `Ok` response whose best matching is not a usable route.
pub const INVALID_MATCH: &str = "InvalidMatch";

/// Code reported when the service could not be reached or its reply could not be read.
pub const TRANSPORT_ERROR: &str = "TransportError";

/// A map matching request: three parallel `;`-joined lists, one entry per sampled point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    /// `lon,lat` pairs
    pub coordinates: String,
    /// Unix seconds
    pub timestamps: String,
    /// Search radius in meters
    pub radiuses: String,
}

impl MatchRequest {
    /// Number of coordinates carried by the request.
    pub fn coordinate_count(&self) -> usize {
        if self.coordinates.is_empty() {
            0
        } else {
            self.coordinates.split(';').count()
        }
    }
}

/// GeoJSON LineString geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStringGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[lon, lat]` positions
    pub coordinates: Vec<[f64; 2]>,
}

impl LineStringGeometry {
    pub fn from_points(points: &[GpsPoint]) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates: points.iter().map(GpsPoint::to_lon_lat).collect(),
        }
    }

    pub fn to_points(&self) -> Vec<GpsPoint> {
        self.coordinates
            .iter()
            .copied()
            .map(GpsPoint::from_lon_lat)
            .collect()
    }
}

/// One candidate matching returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matching {
    pub geometry: LineStringGeometry,
    pub confidence: f64,
}

/// Map matching service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResponse {
    pub code: String,
    #[serde(default)]
    pub matchings: Option<Vec<Matching>>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MatchResponse {
    /// Interpret the response: the first candidate of an `Ok` response becomes
    /// the matched route; anything else is a [`JourneyError::MatchFailure`].
    pub fn into_route(self) -> Result<MatchedRoute> {
        if self.code != MATCH_OK {
            let message = self
                .message
                .unwrap_or_else(|| "map matching service returned no message".to_string());
            return Err(JourneyError::match_failure(self.code, message));
        }

        let best = self
            .matchings
            .and_then(|m| m.into_iter().next())
            .ok_or_else(|| JourneyError::match_failure(NO_MATCHINGS, "response contained no matchings"))?;

        MatchedRoute::new(best.geometry.to_points(), best.confidence)
            .map_err(|e| JourneyError::match_failure(INVALID_MATCH, e.to_string()))
    }
}

/// The map matching collaborator.
///
/// One call is one synchronous request/response. `Err` means the service could
/// not be reached or its reply could not be read; implementations must not retry.
pub trait MapMatcher {
    fn match_trace(&self, request: &MatchRequest) -> std::result::Result<MatchResponse, String>;
}

impl<M: MapMatcher + ?Sized> MapMatcher for &M {
    fn match_trace(&self, request: &MatchRequest) -> std::result::Result<MatchResponse, String> {
        (**self).match_trace(request)
    }
}

/// A road-snapped polyline with the service's confidence score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRoute {
    points: Vec<GpsPoint>,
    confidence: f64,
}

impl MatchedRoute {
    /// Validate and wrap a matched polyline.
    ///
    /// Requires at least 2 valid vertices and a confidence in [0, 1].
    pub fn new(points: Vec<GpsPoint>, confidence: f64) -> Result<Self> {
        if points.len() < 2 {
            return Err(JourneyError::InvalidRoute {
                message: format!("route has {} vertices, at least 2 required", points.len()),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.is_valid()) {
            return Err(JourneyError::InvalidRoute {
                message: format!("vertex {} has invalid coordinates", index),
            });
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(JourneyError::InvalidRoute {
                message: format!("confidence {} is outside [0, 1]", confidence),
            });
        }
        Ok(Self { points, confidence })
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.points
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Route length in meters.
    pub fn length(&self) -> f64 {
        geo_utils::polyline_length(&self.points)
    }

    /// The route as a GeoJSON LineString.
    pub fn to_geometry(&self) -> LineStringGeometry {
        LineStringGeometry::from_points(&self.points)
    }
}

impl<'de> Deserialize<'de> for MatchedRoute {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Unchecked {
            points: Vec<GpsPoint>,
            confidence: f64,
        }

        let unchecked = Unchecked::deserialize(deserializer)?;
        MatchedRoute::new(unchecked.points, unchecked.confidence).map_err(serde::de::Error::custom)
    }
}
