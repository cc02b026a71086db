use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::location::Location;

/// Persistence seam for extracted locations. The pipeline hands records
/// over by value and retains no reference; real database adapters live
/// with the caller.
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn insert(&self, location: Location) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Location>>;
    async fn find_by_url(&self, url: &str) -> Result<Vec<Location>>;
    /// Merge caller-supplied fields (rating, tags, notes) into every record
    /// stored for a URL; returns the number of records touched.
    async fn update_by_url(&self, url: &str, fields: Map<String, Value>) -> Result<usize>;
}

/// In-memory store used by tests and the CLI
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, StoredRecord>>,
}

struct StoredRecord {
    location: Location,
    extra_fields: Map<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn insert(&self, location: Location) -> Result<()> {
        // Batch-scoped ids collide across runs; key by id + source url
        let key = format!("{}#{}", location.source.url, location.id);
        self.records.write().await.insert(
            key,
            StoredRecord {
                location,
                extra_fields: Map::new(),
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Location>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.location.id == id)
            .map(|r| r.location.clone()))
    }

    async fn find_by_url(&self, url: &str) -> Result<Vec<Location>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.location.source.url == url)
            .map(|r| r.location.clone())
            .collect())
    }

    async fn update_by_url(&self, url: &str, fields: Map<String, Value>) -> Result<usize> {
        let mut records = self.records.write().await;
        let mut touched = 0;
        for record in records.values_mut() {
            if record.location.source.url == url {
                for (key, value) in &fields {
                    record.extra_fields.insert(key.clone(), value.clone());
                }
                touched += 1;
            }
        }
        Ok(touched)
    }
}
