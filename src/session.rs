//! Playback session: one journey's clock, geometries and display toggle.
//!
//! Combines a [`PlaybackClock`] over the raw trajectory with a
//! [`CorrespondenceMapper`] so a host can render a frame (marker position and
//! traveled prefix) after every tick.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::correspondence::{CorrespondenceMapper, PathProfile};
use crate::map_matching::MatchedRoute;
use crate::playback::{PlaybackClock, PlaybackMode, PlaybackSpeed, PlaybackState};
use crate::trajectory::{JourneySummary, RawTrajectory};
use crate::traveled::traveled_path;
use crate::GpsPoint;

/// Everything a host needs to draw one playback frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackFrame {
    /// Marker position on the displayed geometry
    pub position: GpsPoint,
    /// Prefix of the displayed geometry up to the marker
    pub traveled: Vec<GpsPoint>,
    pub current_index: usize,
    pub mode: PlaybackMode,
    pub speed: PlaybackSpeed,
    pub progress_fraction: f64,
    /// Readout of the raw point at `current_index`
    pub time: DateTime<Utc>,
    pub velocity: Option<f64>,
    pub bearing: Option<f64>,
}

/// Playback of one journey, optionally over its matched route.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    trajectory: RawTrajectory,
    mapper: CorrespondenceMapper,
    clock: PlaybackClock,
}

impl PlaybackSession {
    pub fn new(trajectory: RawTrajectory, matched: Option<MatchedRoute>) -> Self {
        let raw = PathProfile::new(trajectory.path());
        let velocities = trajectory.points().iter().map(|p| p.velocity).collect();
        let clock = PlaybackClock::from_parts(raw.distances().to_vec(), velocities);
        let matched = matched.map(|route| PathProfile::new(route.points().to_vec()));

        debug!(
            "[PlaybackSession] {} raw points, {:.0}m raw, matched: {}",
            trajectory.len(),
            raw.total(),
            matched
                .as_ref()
                .map(|m| format!("{:.0}m", m.total()))
                .unwrap_or_else(|| "none".to_string())
        );

        Self {
            trajectory,
            mapper: CorrespondenceMapper::new(raw, matched),
            clock,
        }
    }

    pub fn trajectory(&self) -> &RawTrajectory {
        &self.trajectory
    }

    pub fn summary(&self) -> JourneySummary {
        self.trajectory.summary()
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn has_matched_route(&self) -> bool {
        self.mapper.matched().is_some()
    }

    /// Switch between the matched route and the raw trace. Ignored by
    /// rendering when no matched route exists.
    pub fn set_show_matched(&mut self, show: bool) {
        self.mapper.set_show_matched(show);
    }

    pub fn show_matched(&self) -> bool {
        self.mapper.displayed_matched().is_some()
    }

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn seek(&mut self, index: usize) {
        self.clock.seek(index);
    }

    pub fn step_forward(&mut self) {
        self.clock.step_forward();
    }

    pub fn step_back(&mut self) {
        self.clock.step_back();
    }

    pub fn cycle_speed(&mut self) -> PlaybackSpeed {
        self.clock.cycle_speed()
    }

    pub fn tick(&mut self, dt_ms: f64) {
        let before = self.clock.mode();
        self.clock.tick(dt_ms);
        if before == PlaybackMode::Playing && self.clock.mode() == PlaybackMode::Ended {
            debug!("[PlaybackSession] Playback ended");
        }
    }

    /// Render the current frame.
    pub fn frame(&self) -> PlaybackFrame {
        let state = self.clock.state();
        let r = self.clock.progress_distance();

        let position = self.mapper.position(r);
        let traveled = match (self.mapper.displayed_matched(), self.mapper.matched_distance(r)) {
            (Some(matched), Some(m)) => traveled_path(matched.points(), matched.distances(), m),
            _ => {
                let raw = self.mapper.raw();
                traveled_path(raw.points(), raw.distances(), r)
            }
        };

        let point = &self.trajectory.points()[state.current_index];
        PlaybackFrame {
            position,
            traveled,
            current_index: state.current_index,
            mode: state.mode,
            speed: state.speed,
            progress_fraction: self.clock.progress_fraction(),
            time: point.time,
            velocity: point.velocity,
            bearing: point.bearing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::haversine_distance;
    use crate::trajectory::TrajectoryPoint;
    use chrono::{Duration, TimeZone};

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
    }

    // Three points east along the equator, ~111 m apart
    fn trajectory() -> RawTrajectory {
        RawTrajectory::new(vec![
            TrajectoryPoint::new(t(0), 0.0, 0.0).with_velocity(10.0).with_bearing(90.0),
            TrajectoryPoint::new(t(11), 0.0, 0.001).with_velocity(10.0),
            TrajectoryPoint::new(t(22), 0.0, 0.002),
        ])
        .unwrap()
    }

    // Detours north: twice as long as the raw trace
    fn matched() -> MatchedRoute {
        MatchedRoute::new(
            vec![
                GpsPoint::new(0.0, 0.0),
                GpsPoint::new(0.001, 0.0),
                GpsPoint::new(0.001, 0.002),
                GpsPoint::new(0.0, 0.002),
            ],
            0.9,
        )
        .unwrap()
    }

    #[test]
    fn test_initial_frame() {
        let session = PlaybackSession::new(trajectory(), None);
        let frame = session.frame();
        assert_eq!(frame.position, GpsPoint::new(0.0, 0.0));
        assert_eq!(frame.traveled, vec![GpsPoint::new(0.0, 0.0)]);
        assert_eq!(frame.mode, PlaybackMode::Stopped);
        assert_eq!(frame.time, t(0));
        assert_eq!(frame.velocity, Some(10.0));
        assert_eq!(frame.bearing, Some(90.0));
        assert_eq!(frame.progress_fraction, 0.0);
    }

    #[test]
    fn test_raw_frame_follows_clock() {
        let mut session = PlaybackSession::new(trajectory(), None);
        session.play();
        session.tick(5000.0);

        let frame = session.frame();
        assert_eq!(frame.current_index, 0);
        assert_eq!(frame.traveled.len(), 2);
        assert!((haversine_distance(&frame.traveled[0], &frame.position) - 50.0).abs() < 1e-6);
        assert_eq!(frame.traveled[1], frame.position);
    }

    #[test]
    fn test_matched_frame_uses_matched_geometry() {
        let mut session = PlaybackSession::new(trajectory(), Some(matched()));
        assert!(session.show_matched());
        session.seek(1);

        let frame = session.frame();
        // Halfway along the raw trace is halfway along the detour
        assert!((frame.position.latitude - 0.001).abs() < 1e-9);
        assert!((frame.position.longitude - 0.001).abs() < 1e-9);
        assert_eq!(frame.traveled.len(), 3);
        assert_eq!(frame.traveled[1], GpsPoint::new(0.001, 0.0));
        assert_eq!(frame.time, t(11));
    }

    #[test]
    fn test_toggle_switches_geometry() {
        let mut session = PlaybackSession::new(trajectory(), Some(matched()));
        session.seek(1);
        session.set_show_matched(false);
        assert!(!session.show_matched());

        let frame = session.frame();
        assert_eq!(frame.position, GpsPoint::new(0.0, 0.001));
        assert_eq!(frame.traveled, vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 0.001)]);
    }

    #[test]
    fn test_toggle_without_matched_route() {
        let mut session = PlaybackSession::new(trajectory(), None);
        session.set_show_matched(true);
        assert!(!session.show_matched());
        assert!(!session.has_matched_route());
    }

    #[test]
    fn test_ended_frame_covers_everything() {
        let mut session = PlaybackSession::new(trajectory(), Some(matched()));
        session.play();
        session.tick(60_000.0);

        let frame = session.frame();
        assert_eq!(frame.mode, PlaybackMode::Ended);
        assert_eq!(frame.progress_fraction, 1.0);
        assert_eq!(frame.traveled, matched().points().to_vec());
        assert_eq!(frame.velocity, None);
    }

    #[test]
    fn test_summary_passthrough() {
        let session = PlaybackSession::new(trajectory(), None);
        let summary = session.summary();
        assert_eq!(summary.point_count, 3);
        assert_eq!(summary.duration_s, 22.0);
    }
}
