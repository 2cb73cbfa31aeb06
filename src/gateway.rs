//! CustomerStateGateway — load/save façade over the customer store, plus the
//! per-identifier locks that serialize work for one customer.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::customer::CustomerSnapshot;
use crate::error::DatabaseError;
use crate::store::CustomerStore;

/// One async mutex per key, created on demand.
///
/// Entries nobody holds or waits on are dropped on the next `lock` call, so
/// the map only grows with the number of identifiers in flight.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks.retain(|k, m| k == key || Arc::strong_count(m) > 1);
            locks.entry(key.to_string()).or_default().clone()
        };
        entry.lock_owned().await
    }

    /// Keys currently tracked.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// A snapshot fresh from the store.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub snapshot: CustomerSnapshot,
    /// Differs from what is stored: a new customer, or a refreshed display name.
    pub dirty: bool,
}

pub struct CustomerStateGateway {
    store: Arc<dyn CustomerStore>,
    locks: KeyedLocks,
}

impl CustomerStateGateway {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Exclusive access to one customer for a load–handle–save cycle.
    pub async fn lock(&self, identifier: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(identifier).await
    }

    pub fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Load the customer, or build a new `NotStarted` snapshot for an unseen
    /// identifier. Nothing is written here.
    pub async fn load_or_create(
        &self,
        identifier: &str,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Loaded, DatabaseError> {
        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());

        match self.store.load(identifier).await? {
            Some(mut snapshot) => {
                let refreshed = display_name
                    .filter(|name| snapshot.display_name.as_deref() != Some(*name));
                if let Some(name) = refreshed {
                    debug!(identifier, "Display name refreshed");
                    snapshot.display_name = Some(name.to_string());
                }
                Ok(Loaded {
                    snapshot,
                    dirty: refreshed.is_some(),
                })
            }
            None => {
                info!(identifier, "New customer");
                let mut snapshot = CustomerSnapshot::new(identifier, now);
                snapshot.display_name = display_name.map(str::to_string);
                Ok(Loaded {
                    snapshot,
                    dirty: true,
                })
            }
        }
    }

    pub async fn save(&self, snapshot: &CustomerSnapshot) -> Result<(), DatabaseError> {
        self.store.save(snapshot).await
    }

    /// Read without locking, for status endpoints.
    pub async fn get(&self, identifier: &str) -> Result<Option<CustomerSnapshot>, DatabaseError> {
        self.store.load(identifier).await
    }

    pub async fn count(&self) -> Result<usize, DatabaseError> {
        self.store.count().await
    }
}
