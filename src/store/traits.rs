//! Backend-agnostic storage trait for customer snapshots.

use async_trait::async_trait;

use crate::customer::CustomerSnapshot;
use crate::error::DatabaseError;

/// Key-value store of customer snapshots.
///
/// `save` replaces the whole snapshot in one write: after a failed save the
/// previously stored snapshot is still the one returned by `load`.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn load(&self, identifier: &str) -> Result<Option<CustomerSnapshot>, DatabaseError>;

    async fn save(&self, snapshot: &CustomerSnapshot) -> Result<(), DatabaseError>;

    /// Number of stored customers.
    async fn count(&self) -> Result<usize, DatabaseError>;
}
