//! Raw GPS trajectories.
//!
//! A [`RawTrajectory`] is validated once at construction: every coordinate is
//! finite and in range, and timestamps strictly increase. Everything downstream
//! (distance model, sampler, playback clock) relies on that and never guards
//! against NaN mid-computation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{JourneyError, OptionExt, Result};
use crate::{geo_utils, Bounds, GpsPoint};

/// A single GPS sample reported by a tracking device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Reported ground speed in m/s
    pub velocity: Option<f64>,
    /// Reported heading in degrees
    pub bearing: Option<f64>,
    /// Dilution of precision (larger = less accurate)
    pub dop: Option<f64>,
    /// Position of the sample in the device's event stream
    pub sequence_index: u32,
}

impl TrajectoryPoint {
    /// Create a point with no optional measurements.
    pub fn new(time: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            time,
            latitude,
            longitude,
            velocity: None,
            bearing: None,
            dop: None,
            sequence_index: 0,
        }
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    pub fn with_dop(mut self, dop: f64) -> Self {
        self.dop = Some(dop);
        self
    }

    pub fn with_sequence_index(mut self, sequence_index: u32) -> Self {
        self.sequence_index = sequence_index;
        self
    }

    /// Coordinates of this sample.
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    fn validate(&self, index: usize) -> Result<()> {
        if !self.position().is_valid() {
            return Err(JourneyError::InvalidPoint {
                index,
                message: format!(
                    "coordinates ({}, {}) are not a valid latitude/longitude",
                    self.latitude, self.longitude
                ),
            });
        }
        let optional = [
            ("velocity", self.velocity),
            ("bearing", self.bearing),
            ("dop", self.dop),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                if !v.is_finite() || (name != "bearing" && v < 0.0) {
                    return Err(JourneyError::InvalidPoint {
                        index,
                        message: format!("{} {} is out of range", name, v),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Ordered, validated sequence of GPS samples for one journey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTrajectory {
    points: Vec<TrajectoryPoint>,
}

impl RawTrajectory {
    /// Validate and wrap a sequence of samples.
    ///
    /// Fails with [`JourneyError::InsufficientPoints`] when empty,
    /// [`JourneyError::InvalidPoint`] for non-finite or out-of-range values and
    /// [`JourneyError::NonIncreasingTime`] when timestamps do not strictly
    /// increase.
    pub fn new(points: Vec<TrajectoryPoint>) -> Result<Self> {
        points.first().ok_or_insufficient_points(0, 1)?;

        for (index, point) in points.iter().enumerate() {
            point.validate(index)?;
        }
        if let Some(index) = points
            .windows(2)
            .position(|w| w[1].time <= w[0].time)
        {
            return Err(JourneyError::NonIncreasingTime { index: index + 1 });
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: a trajectory holds at least one point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The trajectory projected to plain coordinates.
    pub fn path(&self) -> Vec<GpsPoint> {
        self.points.iter().map(TrajectoryPoint::position).collect()
    }

    /// Distance, duration and speed figures for the journey list.
    pub fn summary(&self) -> JourneySummary {
        let path = self.path();
        let distance_m = geo_utils::polyline_length(&path);

        let first = &self.points[0];
        let last = &self.points[self.points.len() - 1];
        let duration_s = (last.time - first.time).num_milliseconds() as f64 / 1000.0;

        let average_speed_mps = if duration_s > 0.0 {
            distance_m / duration_s
        } else {
            0.0
        };
        let max_speed_mps = self
            .points
            .iter()
            .filter_map(|p| p.velocity)
            .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))));

        JourneySummary {
            point_count: self.points.len(),
            distance_m,
            duration_s,
            average_speed_mps,
            max_speed_mps,
            bounds: geo_utils::compute_bounds(&path),
        }
    }
}

impl<'de> Deserialize<'de> for RawTrajectory {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Unchecked {
            points: Vec<TrajectoryPoint>,
        }

        let unchecked = Unchecked::deserialize(deserializer)?;
        RawTrajectory::new(unchecked.points).map_err(serde::de::Error::custom)
    }
}

/// Headline figures for one journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneySummary {
    pub point_count: usize,
    /// Length of the raw trace in meters
    pub distance_m: f64,
    /// Time between first and last sample in seconds
    pub duration_s: f64,
    /// Raw trace length over duration; 0 for a zero-duration journey
    pub average_speed_mps: f64,
    /// Largest reported velocity, if any point reported one
    pub max_speed_mps: Option<f64>,
    pub bounds: Bounds,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn sample_points() -> Vec<TrajectoryPoint> {
        (0..5)
            .map(|i| {
                TrajectoryPoint::new(t(i * 10), 51.5074 + i as f64 * 0.001, -0.1278)
                    .with_velocity(8.0 + i as f64)
                    .with_sequence_index(i as u32)
            })
            .collect()
    }

    #[test]
    fn test_valid_trajectory() {
        let trajectory = RawTrajectory::new(sample_points()).unwrap();
        assert_eq!(trajectory.len(), 5);
        assert!(!trajectory.is_empty());
        assert_eq!(trajectory.path()[2], GpsPoint::new(51.5094, -0.1278));
    }

    #[test]
    fn test_single_point_is_valid() {
        let trajectory = RawTrajectory::new(vec![TrajectoryPoint::new(t(0), 10.0, 20.0)]).unwrap();
        assert_eq!(trajectory.len(), 1);
    }

    #[test]
    fn test_empty_trajectory_rejected() {
        assert_eq!(
            RawTrajectory::new(vec![]),
            Err(JourneyError::InsufficientPoints {
                point_count: 0,
                minimum_required: 1
            })
        );
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let mut points = sample_points();
        points[3].latitude = f64::NAN;
        assert!(matches!(
            RawTrajectory::new(points),
            Err(JourneyError::InvalidPoint { index: 3, .. })
        ));

        let mut points = sample_points();
        points[1].longitude = 200.0;
        assert!(matches!(
            RawTrajectory::new(points),
            Err(JourneyError::InvalidPoint { index: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_measurements_rejected() {
        let mut points = sample_points();
        points[0].velocity = Some(f64::INFINITY);
        assert!(matches!(
            RawTrajectory::new(points),
            Err(JourneyError::InvalidPoint { index: 0, .. })
        ));

        let mut points = sample_points();
        points[2].dop = Some(-1.0);
        assert!(matches!(
            RawTrajectory::new(points),
            Err(JourneyError::InvalidPoint { index: 2, .. })
        ));

        // Negative bearings are a valid way to express a heading
        let mut points = sample_points();
        points[2].bearing = Some(-90.0);
        assert!(RawTrajectory::new(points).is_ok());
    }

    #[test]
    fn test_non_increasing_time_rejected() {
        let mut points = sample_points();
        points[3].time = points[2].time;
        assert_eq!(
            RawTrajectory::new(points),
            Err(JourneyError::NonIncreasingTime { index: 3 })
        );
    }

    #[test]
    fn test_summary() {
        let trajectory = RawTrajectory::new(sample_points()).unwrap();
        let summary = trajectory.summary();
        assert_eq!(summary.point_count, 5);
        assert_eq!(summary.duration_s, 40.0);
        // 4 x ~111 m
        assert!((summary.distance_m - 444.8).abs() < 2.0);
        assert!((summary.average_speed_mps - summary.distance_m / 40.0).abs() < 1e-9);
        assert_eq!(summary.max_speed_mps, Some(12.0));
        assert_eq!(summary.bounds.min_lat, 51.5074);
    }

    #[test]
    fn test_summary_without_velocity() {
        let points = vec![
            TrajectoryPoint::new(t(0), 0.0, 0.0),
            TrajectoryPoint::new(t(0) + Duration::milliseconds(500), 0.0, 0.001),
        ];
        let summary = RawTrajectory::new(points).unwrap().summary();
        assert_eq!(summary.max_speed_mps, None);
        assert_eq!(summary.duration_s, 0.5);
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"points":[
            {"time":"2024-01-01T00:00:00Z","latitude":1.0,"longitude":2.0,"velocity":null,"bearing":null,"dop":null,"sequence_index":0},
            {"time":"2024-01-01T00:00:00Z","latitude":1.0,"longitude":2.1,"velocity":null,"bearing":null,"dop":null,"sequence_index":1}
        ]}"#;
        assert!(serde_json::from_str::<RawTrajectory>(json).is_err());

        let trajectory = RawTrajectory::new(sample_points()).unwrap();
        let round_trip: RawTrajectory =
            serde_json::from_str(&serde_json::to_string(&trajectory).unwrap()).unwrap();
        assert_eq!(round_trip, trajectory);
    }
}
