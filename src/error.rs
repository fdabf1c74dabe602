//! Unified error handling for the journey-replay library.
//!
//! Trajectory validation, map matching and route storage all report through
//! [`JourneyError`]. Playback never errors: out-of-range seeks and steps are
//! clamped by the clock instead.

use thiserror::Error;

/// Unified error type for journey-replay operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JourneyError {
    /// Trajectory has too few points for the operation
    #[error("trajectory has {point_count} points, minimum {minimum_required} required")]
    InsufficientPoints {
        point_count: usize,
        minimum_required: usize,
    },

    /// A point has non-finite or out-of-range coordinates
    #[error("point {index} is invalid: {message}")]
    InvalidPoint { index: usize, message: String },

    /// Point timestamps are not strictly increasing
    #[error("point {index} is not later than the point before it")]
    NonIncreasingTime { index: usize },

    /// A matched route failed validation
    #[error("invalid matched route: {message}")]
    InvalidRoute { message: String },

    /// The map matching service returned a non-Ok code or could not be reached
    #[error("map matching failed ({code}): {message}")]
    MatchFailure { code: String, message: String },

    /// Matched route storage error
    #[error("persistence error: {message}")]
    Persistence { message: String },
}

impl JourneyError {
    /// Build a match failure from a response code and message.
    pub fn match_failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        JourneyError::MatchFailure {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a persistence error from anything printable.
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        JourneyError::Persistence {
            message: err.to_string(),
        }
    }
}

/// Result type alias for journey-replay operations.
pub type Result<T> = std::result::Result<T, JourneyError>;

/// Extension trait for converting Option to JourneyError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an insufficient points error.
    fn ok_or_insufficient_points(self, point_count: usize, minimum: usize) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(self, point_count: usize, minimum: usize) -> Result<T> {
        self.ok_or(JourneyError::InsufficientPoints {
            point_count,
            minimum_required: minimum,
        })
    }
}
