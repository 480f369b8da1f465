use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::info;

use feedstore_core::Record;

use crate::error::StoreError;
use crate::store::{CollectionRef, DocumentStore, Snapshot, UpsertSummary};

/// In-process document store keyed by canonical identity key.
pub struct MemoryStore {
    collection: CollectionRef,
    documents: RwLock<IndexMap<String, Record>>,
}

impl MemoryStore {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            collection,
            documents: RwLock::new(IndexMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert(&self, records: &[Record]) -> Result<UpsertSummary, StoreError> {
        let mut documents = self.documents.write().await;
        let mut summary = UpsertSummary::default();
        for record in records {
            let previous = documents.insert(record.key().canonical(), record.clone());
            summary.record(previous.is_some());
        }
        info!(
            collection = %self.collection,
            rows = summary.rows,
            update = summary.updated,
            insert = summary.inserted,
            "upsert complete"
        );
        Ok(summary)
    }

    async fn fetch_all(&self) -> Result<Snapshot, StoreError> {
        let documents = self.documents.read().await;
        Ok(Snapshot::from_records(documents.values().cloned().collect()))
    }

    fn collection(&self) -> &CollectionRef {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance;

    fn store() -> MemoryStore {
        MemoryStore::new(CollectionRef::new("energy", "energy"))
    }

    #[tokio::test]
    async fn idempotent_upsert() {
        conformance::idempotent_upsert(&store()).await;
    }

    #[tokio::test]
    async fn last_write_wins() {
        conformance::last_write_wins(&store()).await;
    }

    #[tokio::test]
    async fn empty_sentinel() {
        conformance::empty_sentinel(&store()).await;
    }

    #[tokio::test]
    async fn summary_counts() {
        conformance::summary_counts(&store()).await;
    }

    #[tokio::test]
    async fn composite_keys() {
        conformance::composite_keys(&store()).await;
    }

    #[tokio::test]
    async fn len_tracks_distinct_keys() {
        let store = store();
        assert!(store.is_empty().await);
        store
            .upsert(&[conformance::grid_record("2020-01-01T00:00", 1), conformance::grid_record("2020-01-01T00:00", 2)])
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
    }
}
