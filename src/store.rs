//! Matched route storage boundary.
//!
//! Records are keyed by device and journey and are only ever written whole:
//! a new match replaces the previous record, a failed match never touches it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::map_matching::{LineStringGeometry, MatchedRoute};

/// Identifies one journey of one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JourneyKey {
    pub device_id: String,
    pub journey_id: String,
}

impl JourneyKey {
    pub fn new(device_id: impl Into<String>, journey_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            journey_id: journey_id.into(),
        }
    }
}

impl fmt::Display for JourneyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.journey_id)
    }
}

/// A stored match result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRouteRecord {
    pub route: MatchedRoute,
    /// When the match was produced, epoch milliseconds
    pub matched_at: i64,
}

impl MatchedRouteRecord {
    /// The record in its wire shape: `{ matched_route, match_confidence, matched_at }`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "matched_route": self.route.to_geometry(),
            "match_confidence": self.route.confidence(),
            "matched_at": self.matched_at,
        })
    }

    /// Parse a record from its wire shape.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        #[derive(Deserialize)]
        struct Wire {
            matched_route: LineStringGeometry,
            match_confidence: f64,
            matched_at: i64,
        }

        let wire: Wire = serde_json::from_value(value.clone())
            .map_err(|e| crate::JourneyError::persistence(format!("malformed record: {}", e)))?;
        Ok(Self {
            route: MatchedRoute::new(wire.matched_route.to_points(), wire.match_confidence)?,
            matched_at: wire.matched_at,
        })
    }
}

/// Storage collaborator for matched routes.
pub trait MatchedRouteStore {
    /// Store a record, replacing any previous one for the journey.
    fn save(&mut self, key: &JourneyKey, record: MatchedRouteRecord) -> Result<()>;

    /// Load the record for a journey, if one was stored.
    fn load(&self, key: &JourneyKey) -> Result<Option<MatchedRouteRecord>>;

    /// Remove the record for a journey. Returns whether one existed.
    fn remove(&mut self, key: &JourneyKey) -> Result<bool>;
}

impl<S: MatchedRouteStore + ?Sized> MatchedRouteStore for &mut S {
    fn save(&mut self, key: &JourneyKey, record: MatchedRouteRecord) -> Result<()> {
        (**self).save(key, record)
    }

    fn load(&self, key: &JourneyKey) -> Result<Option<MatchedRouteRecord>> {
        (**self).load(key)
    }

    fn remove(&mut self, key: &JourneyKey) -> Result<bool> {
        (**self).remove(key)
    }
}

/// In-memory matched route store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRouteStore {
    records: HashMap<JourneyKey, MatchedRouteRecord>,
}

impl InMemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MatchedRouteStore for InMemoryRouteStore {
    fn save(&mut self, key: &JourneyKey, record: MatchedRouteRecord) -> Result<()> {
        self.records.insert(key.clone(), record);
        Ok(())
    }

    fn load(&self, key: &JourneyKey) -> Result<Option<MatchedRouteRecord>> {
        Ok(self.records.get(key).cloned())
    }

    fn remove(&mut self, key: &JourneyKey) -> Result<bool> {
        Ok(self.records.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpsPoint;

    fn record(confidence: f64, matched_at: i64) -> MatchedRouteRecord {
        MatchedRouteRecord {
            route: MatchedRoute::new(
                vec![GpsPoint::new(51.5, -0.12), GpsPoint::new(51.501, -0.121)],
                confidence,
            )
            .unwrap(),
            matched_at,
        }
    }

    #[test]
    fn test_save_replaces() {
        let key = JourneyKey::new("dev:1", "42");
        let mut store = InMemoryRouteStore::new();
        assert!(store.load(&key).unwrap().is_none());

        store.save(&key, record(0.3, 1)).unwrap();
        store.save(&key, record(0.8, 2)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load(&key).unwrap(), Some(record(0.8, 2)));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut store = InMemoryRouteStore::new();
        store.save(&JourneyKey::new("dev:1", "42"), record(0.3, 1)).unwrap();
        store.save(&JourneyKey::new("dev:2", "42"), record(0.6, 1)).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.remove(&JourneyKey::new("dev:1", "42")).unwrap());
        assert!(!store.remove(&JourneyKey::new("dev:1", "42")).unwrap());
        assert!(store.load(&JourneyKey::new("dev:2", "42")).unwrap().is_some());
    }

    #[test]
    fn test_wire_shape() {
        let json = record(0.75, 1_700_000_000_123).to_json();
        assert_eq!(json["match_confidence"], 0.75);
        assert_eq!(json["matched_at"], 1_700_000_000_123_i64);
        assert_eq!(json["matched_route"]["type"], "LineString");
        assert_eq!(json["matched_route"]["coordinates"][0][0], -0.12);

        assert_eq!(MatchedRouteRecord::from_json(&json).unwrap(), record(0.75, 1_700_000_000_123));
        assert!(MatchedRouteRecord::from_json(&serde_json::json!({"matched_at": 1})).is_err());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(JourneyKey::new("dev:1", "42").to_string(), "dev:1/42");
    }
}
