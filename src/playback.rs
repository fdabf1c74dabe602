//! # Playback Clock
//!
//! Time-driven state machine that moves a playback position along a raw
//! trajectory.
//!
//! The clock owns no timer and never reads the wall clock. A host (render loop,
//! timer, test harness) calls [`PlaybackClock::tick`] with the elapsed
//! milliseconds since its previous call; the clock's evolution depends only on
//! that sequence of deltas. Stopping playback is just not calling `tick`, or
//! calling [`PlaybackClock::pause`].
//!
//! ## States
//!
//! | Mode | Meaning |
//! |------|---------|
//! | `Stopped` | Initial; behaves as paused at the first point |
//! | `Playing` | `tick` advances the position |
//! | `Paused` | Position held; seek and step allowed |
//! | `Ended` | Reached the last point; `play` restarts from the beginning |
//!
//! Each tick moves `velocity x speed x dt` meters, where velocity is the
//! current point's reported speed (or [`DEFAULT_VELOCITY_MPS`]). Progress is
//! tracked as a fraction of the current segment; whole segments are crossed
//! with the remaining fraction carried over, and reaching the last point ends
//! playback.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::trajectory::RawTrajectory;
use crate::geo_utils;

/// Playback velocity for points that report no speed, in m/s.
///
/// A reported 0 m/s is a measurement, not a gap: playback holds at that point
/// until the host seeks or steps past it.
pub const DEFAULT_VELOCITY_MPS: f64 = 10.0;

// Absorbs float error when summed fractions land on a segment boundary
const PROGRESS_EPSILON: f64 = 1e-9;

/// Playback mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackMode {
    #[default]
    Stopped,
    Playing,
    Paused,
    Ended,
}

/// Playback speed multiplier, cycled in order 1x, 2x, 5x, 10x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    #[default]
    X1,
    X2,
    X5,
    X10,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 4] = [
        PlaybackSpeed::X1,
        PlaybackSpeed::X2,
        PlaybackSpeed::X5,
        PlaybackSpeed::X10,
    ];

    pub fn multiplier(self) -> f64 {
        match self {
            PlaybackSpeed::X1 => 1.0,
            PlaybackSpeed::X2 => 2.0,
            PlaybackSpeed::X5 => 5.0,
            PlaybackSpeed::X10 => 10.0,
        }
    }

    /// The next speed, wrapping from 10x back to 1x.
    pub fn next(self) -> Self {
        match self {
            PlaybackSpeed::X1 => PlaybackSpeed::X2,
            PlaybackSpeed::X2 => PlaybackSpeed::X5,
            PlaybackSpeed::X5 => PlaybackSpeed::X10,
            PlaybackSpeed::X10 => PlaybackSpeed::X1,
        }
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

/// Snapshot of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Index of the raw point at or behind the playback position
    pub current_index: usize,
    /// Fraction of the segment to the next point already covered, in [0, 1)
    pub segment_progress: f64,
    pub mode: PlaybackMode,
    pub speed: PlaybackSpeed,
}

/// Host-driven playback state machine over one raw trajectory.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Cumulative raw-trace distance at each point
    distances: Vec<f64>,
    /// Playback velocity at each point, defaults applied
    velocities: Vec<f64>,
    state: PlaybackState,
}

impl PlaybackClock {
    /// Create a clock for a trajectory.
    ///
    /// A one-point trajectory has nothing to play and starts `Ended`.
    pub fn new(trajectory: &RawTrajectory) -> Self {
        let distances = geo_utils::cumulative_distances(&trajectory.path());
        let velocities = trajectory.points().iter().map(|p| p.velocity).collect();
        Self::from_parts(distances, velocities)
    }

    /// Create a clock from precomputed cumulative distances and per-point velocities.
    ///
    /// # Panics
    ///
    /// Panics if the inputs are empty or of different lengths.
    pub fn from_parts(distances: Vec<f64>, velocities: Vec<Option<f64>>) -> Self {
        assert!(!distances.is_empty(), "playback needs at least one point");
        assert_eq!(distances.len(), velocities.len());

        let velocities = velocities
            .into_iter()
            .map(|v| v.unwrap_or(DEFAULT_VELOCITY_MPS))
            .collect();

        let mode = if distances.len() == 1 {
            PlaybackMode::Ended
        } else {
            PlaybackMode::Stopped
        };

        Self {
            distances,
            velocities,
            state: PlaybackState {
                current_index: 0,
                segment_progress: 0.0,
                mode,
                speed: PlaybackSpeed::default(),
            },
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn mode(&self) -> PlaybackMode {
        self.state.mode
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn segment_progress(&self) -> f64 {
        self.state.segment_progress
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.state.speed
    }

    pub fn point_count(&self) -> usize {
        self.distances.len()
    }

    fn last_index(&self) -> usize {
        self.distances.len() - 1
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start or resume playback. From `Ended`, restarts at the first point.
    pub fn play(&mut self) {
        match self.state.mode {
            PlaybackMode::Playing => {}
            PlaybackMode::Ended => {
                self.state.current_index = 0;
                self.state.segment_progress = 0.0;
                self.state.mode = PlaybackMode::Playing;
            }
            PlaybackMode::Stopped | PlaybackMode::Paused => {
                self.state.mode = PlaybackMode::Playing;
            }
        }
    }

    /// Pause playback. No-op unless playing.
    pub fn pause(&mut self) {
        if self.state.mode == PlaybackMode::Playing {
            self.state.mode = PlaybackMode::Paused;
        }
    }

    /// Jump to a point, clamped to the trajectory, and pause there.
    pub fn seek(&mut self, index: usize) {
        self.state.current_index = index.min(self.last_index());
        self.state.segment_progress = 0.0;
        self.state.mode = PlaybackMode::Paused;
    }

    /// Move one point forward while paused (or stopped).
    pub fn step_forward(&mut self) {
        if self.is_steppable() {
            let index = self.state.current_index.saturating_add(1);
            self.seek(index);
        }
    }

    /// Move one point back while paused (or stopped).
    pub fn step_back(&mut self) {
        if self.is_steppable() {
            let index = self.state.current_index.saturating_sub(1);
            self.seek(index);
        }
    }

    fn is_steppable(&self) -> bool {
        matches!(self.state.mode, PlaybackMode::Paused | PlaybackMode::Stopped)
    }

    /// Advance to the next speed multiplier. Valid in any mode.
    pub fn cycle_speed(&mut self) -> PlaybackSpeed {
        self.state.speed = self.state.speed.next();
        self.state.speed
    }

    /// Advance playback by `dt_ms` milliseconds. Only has effect while playing.
    ///
    /// Negative or non-finite deltas count as zero.
    pub fn tick(&mut self, dt_ms: f64) {
        if self.state.mode != PlaybackMode::Playing {
            return;
        }

        let dt_ms = if dt_ms.is_finite() && dt_ms > 0.0 {
            dt_ms
        } else {
            0.0
        };

        let last = self.last_index();
        let index = self.state.current_index;
        if index >= last {
            self.end();
            return;
        }

        let segment = self.distances[index + 1] - self.distances[index];
        if segment <= 0.0 {
            // Duplicate points are crossed instantly
            self.state.current_index += 1;
            self.state.segment_progress = 0.0;
            return;
        }

        let velocity = self.velocities[index] * self.state.speed.multiplier();
        let distance = velocity * dt_ms / 1000.0;
        self.state.segment_progress += distance / segment;

        while self.state.segment_progress >= 1.0 - PROGRESS_EPSILON {
            let carry = self.state.segment_progress - 1.0;
            self.state.segment_progress = if carry > PROGRESS_EPSILON { carry } else { 0.0 };
            self.state.current_index += 1;

            if self.state.current_index >= last {
                self.end();
                break;
            }
        }
    }

    fn end(&mut self) {
        self.state.current_index = self.last_index();
        self.state.segment_progress = 0.0;
        self.state.mode = PlaybackMode::Ended;
    }

    // ========================================================================
    // Progress
    // ========================================================================

    /// Distance along the raw trace of the playback position, in meters.
    pub fn progress_distance(&self) -> f64 {
        let index = self.state.current_index;
        if index >= self.last_index() {
            return self.distances[self.last_index()];
        }
        let segment = self.distances[index + 1] - self.distances[index];
        self.distances[index] + self.state.segment_progress * segment
    }

    /// Overall progress in [0, 1] for a scrub bar.
    pub fn progress_fraction(&self) -> f64 {
        let total = self.distances[self.last_index()];
        if total > 0.0 {
            (self.progress_distance() / total).clamp(0.0, 1.0)
        } else if self.state.current_index == self.last_index() {
            1.0
        } else {
            0.0
        }
    }
}
