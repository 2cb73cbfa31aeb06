//! libSQL backend — one row per customer, snapshot stored as JSON.
//!
//! The phase and points columns mirror the snapshot for ad-hoc queries; the
//! JSON document is the source of truth on load.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use super::migrations;
use super::traits::CustomerStore;
use crate::customer::CustomerSnapshot;
use crate::error::DatabaseError;

/// libSQL customer store.
///
/// Holds a single connection reused for all operations.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// In-memory database, for tests.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

#[async_trait]
impl CustomerStore for LibSqlStore {
    async fn load(&self, identifier: &str) -> Result<Option<CustomerSnapshot>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT snapshot FROM customers WHERE identifier = ?1",
                params![identifier],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_customer: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("load_customer: {e}")))?
        else {
            return Ok(None);
        };

        let json: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("load_customer: {e}")))?;
        let snapshot = serde_json::from_str(&json)
            .map_err(|e| DatabaseError::Serialization(format!("customer {identifier}: {e}")))?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &CustomerSnapshot) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO customers
                    (identifier, snapshot, registration_phase, address_phase, loyalty_points, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(identifier) DO UPDATE SET
                    snapshot = excluded.snapshot,
                    registration_phase = excluded.registration_phase,
                    address_phase = excluded.address_phase,
                    loyalty_points = excluded.loyalty_points,
                    updated_at = excluded.updated_at",
                params![
                    snapshot.identifier.as_str(),
                    json,
                    snapshot.registration_phase.to_string(),
                    snapshot.address_phase.to_string(),
                    i64::from(snapshot.loyalty_points),
                    snapshot.created_at.to_rfc3339(),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_customer: {e}")))?;

        debug!(identifier = %snapshot.identifier, "Customer saved");
        Ok(())
    }

    async fn count(&self) -> Result<usize, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM customers", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_customers: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("count_customers: {e}")))?
        {
            Some(row) => {
                let n: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("count_customers: {e}")))?;
                Ok(n as usize)
            }
            None => Ok(0),
        }
    }
}
