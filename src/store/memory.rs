//! In-process store, used when no database path is configured and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::traits::CustomerStore;
use crate::customer::CustomerSnapshot;
use crate::error::DatabaseError;

#[derive(Default)]
pub struct InMemoryStore {
    customers: RwLock<HashMap<String, CustomerSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn load(&self, identifier: &str) -> Result<Option<CustomerSnapshot>, DatabaseError> {
        Ok(self.customers.read().await.get(identifier).cloned())
    }

    async fn save(&self, snapshot: &CustomerSnapshot) -> Result<(), DatabaseError> {
        self.customers
            .write()
            .await
            .insert(snapshot.identifier.clone(), snapshot.clone());
        Ok(())
    }

    async fn count(&self) -> Result<usize, DatabaseError> {
        Ok(self.customers.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn save_then_load() {
        let store = InMemoryStore::new();
        assert!(store.load("1").await.unwrap().is_none());

        let mut s = CustomerSnapshot::new("1", Utc::now());
        store.save(&s).await.unwrap();
        s.loyalty_points = 100;
        store.save(&s).await.unwrap();

        assert_eq!(store.load("1").await.unwrap().unwrap().loyalty_points, 100);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
