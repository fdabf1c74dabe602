//! # SQLite Route Store
//!
//! Durable [`MatchedRouteStore`] backed by SQLite.
//!
//! One row per journey in `matched_routes`, keyed by `(device_id, journey_id)`.
//! Route vertices are stored as a MessagePack blob; confidence and match time
//! are plain columns so they can be listed without decoding the route.

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{JourneyError, Result};
use crate::map_matching::MatchedRoute;
use crate::store::{JourneyKey, MatchedRouteRecord, MatchedRouteStore};
use crate::GpsPoint;

/// Matched routes persisted in a SQLite database.
pub struct SqliteRouteStore {
    db: Connection,
}

impl SqliteRouteStore {
    // ========================================================================
    // Initialization
    // ========================================================================

    /// Open (or create) the database at `db_path`.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path).map_err(JourneyError::persistence)?;
        Self::init_schema(&db)?;
        info!("[SqliteRouteStore] Opened {}", db_path);
        Ok(Self { db })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS matched_routes (
                device_id TEXT NOT NULL,
                journey_id TEXT NOT NULL,
                route_points BLOB NOT NULL,
                point_count INTEGER NOT NULL,
                match_confidence REAL NOT NULL,
                matched_at INTEGER NOT NULL,
                PRIMARY KEY (device_id, journey_id)
            );
            "#,
        )
        .map_err(JourneyError::persistence)
    }

    /// Number of stored routes.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM matched_routes", [], |row| row.get(0))
            .map_err(JourneyError::persistence)?;
        Ok(count as usize)
    }

    /// Journeys with a stored route for one device, in journey order.
    pub fn journeys_for_device(&self, device_id: &str) -> Result<Vec<JourneyKey>> {
        let mut stmt = self
            .db
            .prepare(
                "SELECT journey_id FROM matched_routes WHERE device_id = ? ORDER BY journey_id",
            )
            .map_err(JourneyError::persistence)?;

        let rows = stmt
            .query_map(params![device_id], |row| row.get::<_, String>(0))
            .map_err(JourneyError::persistence)?;

        let keys = rows
            .map(|journey_id| {
                journey_id
                    .map(|journey_id| JourneyKey::new(device_id, journey_id))
                    .map_err(JourneyError::persistence)
            })
            .collect::<Result<Vec<_>>>();
        keys
    }
}

impl MatchedRouteStore for SqliteRouteStore {
    fn save(&mut self, key: &JourneyKey, record: MatchedRouteRecord) -> Result<()> {
        let points_blob =
            rmp_serde::to_vec(record.route.points()).map_err(JourneyError::persistence)?;

        self.db
            .execute(
                "INSERT OR REPLACE INTO matched_routes
                 (device_id, journey_id, route_points, point_count, match_confidence, matched_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    key.device_id,
                    key.journey_id,
                    points_blob,
                    record.route.points().len() as i64,
                    record.route.confidence(),
                    record.matched_at
                ],
            )
            .map_err(JourneyError::persistence)?;

        debug!(
            "[SqliteRouteStore] Saved {} ({} points)",
            key,
            record.route.points().len()
        );
        Ok(())
    }

    fn load(&self, key: &JourneyKey) -> Result<Option<MatchedRouteRecord>> {
        let row = self
            .db
            .query_row(
                "SELECT route_points, match_confidence, matched_at FROM matched_routes
                 WHERE device_id = ? AND journey_id = ?",
                params![key.device_id, key.journey_id],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(JourneyError::persistence)?;

        let Some((points_blob, confidence, matched_at)) = row else {
            return Ok(None);
        };

        let points: Vec<GpsPoint> =
            rmp_serde::from_slice(&points_blob).map_err(JourneyError::persistence)?;

        Ok(Some(MatchedRouteRecord {
            route: MatchedRoute::new(points, confidence)?,
            matched_at,
        }))
    }

    fn remove(&mut self, key: &JourneyKey) -> Result<bool> {
        let removed = self
            .db
            .execute(
                "DELETE FROM matched_routes WHERE device_id = ? AND journey_id = ?",
                params![key.device_id, key.journey_id],
            )
            .map_err(JourneyError::persistence)?;
        Ok(removed > 0)
    }
}
