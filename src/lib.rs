//! # Journey Replay
//!
//! GPS trajectory reconstruction and synchronized playback for fleet tracking
//! devices.
//!
//! This library provides:
//! - Haversine distance model with cumulative distances and interpolation
//! - Trace sampling and request packaging for an external map matching service
//! - Proportional-distance correspondence between a raw trace and its matched route
//! - Traveled-path extraction for rendering playback progress
//! - A deterministic, host-driven playback clock
//!
//! ## Features
//!
//! - **`http`** - Enable the Mapbox Map Matching client
//! - **`persistence`** - Enable SQLite storage for matched routes
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use journey_replay::{PlaybackSession, RawTrajectory, TrajectoryPoint};
//!
//! let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
//! let points = (0..5)
//!     .map(|i| {
//!         TrajectoryPoint::new(start + chrono::Duration::seconds(i * 10), 51.5 + i as f64 * 0.001, -0.12)
//!             .with_velocity(12.0)
//!     })
//!     .collect();
//! let trajectory = RawTrajectory::new(points).unwrap();
//!
//! let mut session = PlaybackSession::new(trajectory, None);
//! session.play();
//! session.tick(1000.0);
//!
//! let frame = session.frame();
//! assert!(frame.progress_fraction > 0.0);
//! assert!(frame.traveled.len() >= 2);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{JourneyError, OptionExt, Result};

// Geographic utilities (distance model)
pub mod geo_utils;

// Raw trajectories and journey summaries
pub mod trajectory;
pub use trajectory::{JourneySummary, RawTrajectory, TrajectoryPoint};

// Map matching service boundary
pub mod map_matching;
pub use map_matching::{MapMatcher, MatchRequest, MatchResponse, MatchedRoute, Matching};

// Sampling and submission of traces for matching
pub mod sampler;
pub use sampler::{sample_indices, MatchSummary, SamplerConfig, TrajectorySampler};

// Matched route storage boundary
pub mod store;
pub use store::{InMemoryRouteStore, JourneyKey, MatchedRouteRecord, MatchedRouteStore};

// Raw-to-matched progress correspondence
pub mod correspondence;
pub use correspondence::{CorrespondenceMapper, PathProfile};

// Traveled prefix of a path
pub mod traveled;
pub use traveled::traveled_path;

// Playback state machine
pub mod playback;
pub use playback::{PlaybackClock, PlaybackMode, PlaybackSpeed, PlaybackState};

// Per-journey viewing session
pub mod session;
pub use session::{PlaybackFrame, PlaybackSession};

// HTTP module for the Mapbox Map Matching API
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{MapboxConfig, MapboxMatcher};

// SQLite matched route storage
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteRouteStore;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use journey_replay::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a point from a GeoJSON `[lon, lat]` position.
    pub fn from_lon_lat(position: [f64; 2]) -> Self {
        Self::new(position[1], position[0])
    }

    /// GeoJSON `[lon, lat]` position of this point.
    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
