//! End-to-end journey scenarios: match a trace, store the route, play it back.

use std::cell::Cell;

use chrono::{DateTime, Duration, TimeZone, Utc};
use journey_replay::geo_utils::{cumulative_distances, position_at_distance, EARTH_RADIUS_M};
use journey_replay::map_matching::LineStringGeometry;
use journey_replay::{
    CorrespondenceMapper, GpsPoint, InMemoryRouteStore, JourneyError, JourneyKey, MapMatcher,
    MatchRequest, MatchResponse, MatchedRouteStore, Matching, PathProfile, PlaybackClock,
    PlaybackMode, PlaybackSession, RawTrajectory, TrajectoryPoint, TrajectorySampler,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn degrees_for(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_M).to_degrees()
}

fn t(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
}

fn northbound(n: usize, spacing_m: f64, velocity: f64) -> RawTrajectory {
    let step = degrees_for(spacing_m);
    let points = (0..n)
        .map(|i| {
            TrajectoryPoint::new(t(i as i64 * 10), 40.0 + i as f64 * step, -3.7)
                .with_velocity(velocity)
                .with_dop(1.2)
                .with_sequence_index(i as u32)
        })
        .collect();
    RawTrajectory::new(points).unwrap()
}

/// Matcher that counts calls and snaps every trace to a fixed route.
struct CountingMatcher {
    calls: Cell<usize>,
    route: Vec<GpsPoint>,
}

impl CountingMatcher {
    fn new(route: Vec<GpsPoint>) -> Self {
        Self {
            calls: Cell::new(0),
            route,
        }
    }
}

impl MapMatcher for CountingMatcher {
    fn match_trace(&self, request: &MatchRequest) -> Result<MatchResponse, String> {
        self.calls.set(self.calls.get() + 1);
        assert!(request.coordinate_count() <= 100);
        Ok(MatchResponse {
            code: "Ok".to_string(),
            matchings: Some(vec![Matching {
                geometry: LineStringGeometry::from_points(&self.route),
                confidence: 0.87,
            }]),
            message: None,
        })
    }
}

#[test]
fn cumulative_distances_along_the_equator() {
    let path = vec![
        GpsPoint::new(0.0, 0.0),
        GpsPoint::new(0.0, 0.01),
        GpsPoint::new(0.0, 0.02),
    ];
    let d = cumulative_distances(&path);

    assert_eq!(d[0], 0.0);
    assert!((d[1] - 1113.0).abs() / 1113.0 < 0.01);
    assert!((d[2] - 2226.0).abs() / 2226.0 < 0.01);
}

#[test]
fn long_trace_is_sampled_to_the_service_limit() {
    init_logging();
    let trajectory = northbound(250, 20.0, 12.0);
    let matcher = CountingMatcher::new(vec![GpsPoint::new(40.0, -3.7), GpsPoint::new(40.05, -3.7)]);
    let mut sampler = TrajectorySampler::new(&matcher, InMemoryRouteStore::new());

    let request = sampler.build_request(&trajectory).unwrap();
    let coordinates: Vec<&str> = request.coordinates.split(';').collect();
    assert_eq!(coordinates.len(), 100);

    let first = &trajectory.points()[0];
    let last = &trajectory.points()[249];
    assert_eq!(coordinates[0], format!("{},{}", first.longitude, first.latitude));
    assert_eq!(coordinates[99], format!("{},{}", last.longitude, last.latitude));

    let summary = sampler.match_journey(&JourneyKey::new("dev:1", "j1"), &trajectory).unwrap();
    assert_eq!(summary.original_point_count, 250);
    assert_eq!(summary.matched_point_count, 100);
    assert_eq!(matcher.calls.get(), 1);
}

#[test]
fn ten_one_second_ticks_cross_a_hundred_meter_segment() {
    let trajectory = northbound(2, 100.0, 10.0);
    let mut clock = PlaybackClock::new(&trajectory);
    clock.play();

    for _ in 0..9 {
        clock.tick(1000.0);
    }
    assert_eq!(clock.current_index(), 0);

    clock.tick(1000.0);
    assert_eq!(clock.current_index(), 1);
    assert_eq!(clock.segment_progress(), 0.0);
    // Index 1 is the last point of this trace
    assert_eq!(clock.mode(), PlaybackMode::Ended);
}

#[test]
fn quarter_of_raw_trace_is_quarter_of_matched_route() {
    let raw = PathProfile::new(vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(degrees_for(100.0), 0.0)]);
    let matched_points = vec![
        GpsPoint::new(0.0, 0.0),
        GpsPoint::new(degrees_for(120.0), 0.0),
        GpsPoint::new(degrees_for(200.0), 0.0),
    ];
    let matched = PathProfile::new(matched_points.clone());
    assert!((raw.total() - 100.0).abs() < 1e-6);
    assert!((matched.total() - 200.0).abs() < 1e-6);

    let mapper = CorrespondenceMapper::new(raw, Some(matched));
    let m = mapper.matched_distance(25.0).unwrap();
    assert!((m - 50.0).abs() < 1e-6);

    let d = cumulative_distances(&matched_points);
    assert_eq!(mapper.position(25.0), position_at_distance(&matched_points, &d, m));
}

#[test]
fn single_point_trace_is_never_sent() {
    let trajectory = northbound(1, 10.0, 5.0);
    let matcher = CountingMatcher::new(vec![GpsPoint::new(40.0, -3.7), GpsPoint::new(40.01, -3.7)]);
    let mut store = InMemoryRouteStore::new();
    let mut sampler = TrajectorySampler::new(&matcher, &mut store);

    let err = sampler.match_journey(&JourneyKey::new("dev:1", "j1"), &trajectory).unwrap_err();
    assert!(matches!(
        err,
        JourneyError::InsufficientPoints {
            point_count: 1,
            minimum_required: 2
        }
    ));
    assert_eq!(matcher.calls.get(), 0);
    assert!(store.is_empty());
}

#[test]
fn matched_journey_plays_back_on_the_stored_route() {
    init_logging();
    let trajectory = northbound(30, 25.0, 8.0);
    let key = JourneyKey::new("dev:864475040000001", "1700000000");

    // Snapped route: same endpoints, one kink
    let path = trajectory.path();
    let route = vec![
        path[0],
        GpsPoint::new(path[15].latitude, path[15].longitude + 0.0002),
        path[29],
    ];
    let matcher = CountingMatcher::new(route.clone());
    let mut store = InMemoryRouteStore::new();
    TrajectorySampler::new(&matcher, &mut store)
        .match_journey(&key, &trajectory)
        .unwrap();

    let record = store.load(&key).unwrap().expect("route stored");
    assert_eq!(record.route.points(), route.as_slice());
    assert_eq!(record.route.confidence(), 0.87);

    let mut session = PlaybackSession::new(trajectory, Some(record.route));
    session.play();

    let mut previous = 0.0;
    let mut frames = 0;
    while session.state().mode == PlaybackMode::Playing {
        session.tick(250.0);
        let frame = session.frame();
        assert!(frame.progress_fraction >= previous);
        assert!(frame.traveled.len() >= 2 || frame.progress_fraction == 0.0);
        assert_eq!(frame.traveled[0], route[0]);
        previous = frame.progress_fraction;
        frames += 1;
    }

    let end = session.frame();
    assert_eq!(end.mode, PlaybackMode::Ended);
    assert_eq!(end.position, route[2]);
    assert_eq!(end.traveled, route);
    // 725 m at 8 m/s in quarter-second ticks
    assert!((360..=366).contains(&frames));
}
