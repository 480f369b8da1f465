//! Document store over `object_store`: one JSON object per identity key.
//!
//! Documents live at `{prefix}/{database}/{collection}/{sha256(key)}.json`.
//! A single `put` replaces a document atomically, which is what gives
//! upsert its per-document atomicity.

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use feedstore_core::{IdentityKey, Record, KEY_SEPARATOR};

use crate::backend::StorageBackend;
use crate::error::StoreError;
use crate::store::{CollectionRef, DocumentStore, Snapshot, UpsertSummary};

pub struct ObjectDocumentStore {
    store: Arc<dyn ObjectStore>,
    collection: CollectionRef,
    root: Path,
}

impl ObjectDocumentStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str, collection: CollectionRef) -> Self {
        let root = if prefix.is_empty() {
            format!("{}/{}", collection.database, collection.collection)
        } else {
            format!("{}/{}/{}", prefix, collection.database, collection.collection)
        };
        Self {
            store,
            collection,
            root: Path::from(root.as_str()),
        }
    }

    pub fn from_backend(backend: &StorageBackend, collection: CollectionRef) -> Self {
        Self::new(backend.store(), backend.prefix(), collection)
    }

    /// Open the configured collection on the configured backend.
    pub fn from_config(config: &feedstore_core::Config) -> Result<Self, StoreError> {
        let backend = StorageBackend::from_config(config)?;
        let collection = CollectionRef::new(&config.storage.database, &config.storage.collection);
        Ok(Self::from_backend(&backend, collection))
    }

    fn document_path(&self, key: &IdentityKey) -> Path {
        self.root.child(format!("{}.json", key_digest(key)))
    }
}

/// Stable object name for an identity key. Field names are part of the digest
/// so keys of different shape never collide.
fn key_digest(key: &IdentityKey) -> String {
    let mut hasher = Sha256::new();
    for (i, (name, value)) in key.parts().iter().enumerate() {
        if i > 0 {
            hasher.update([KEY_SEPARATOR as u8]);
        }
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_string().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl DocumentStore for ObjectDocumentStore {
    async fn upsert(&self, records: &[Record]) -> Result<UpsertSummary, StoreError> {
        let mut summary = UpsertSummary::default();
        for record in records {
            let path = self.document_path(record.key());
            let matched = match self.store.head(&path).await {
                Ok(_) => true,
                Err(object_store::Error::NotFound { .. }) => false,
                Err(e) => return Err(e.into()),
            };
            let body = serde_json::to_vec(record)?;
            self.store.put(&path, PutPayload::from(body)).await?;
            debug!(key = %record.key(), matched, "document written");
            summary.record(matched);
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
        let mut listing = self.store.list(Some(&self.root));
        let mut records = Vec::new();
        while let Some(meta) = listing.try_next().await? {
            if meta.location.extension() != Some("json") {
                continue;
            }
            let bytes = self.store.get(&meta.location).await?.bytes().await?;
            let record: Record = serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
                path: meta.location.to_string(),
                source,
            })?;
            records.push(record);
        }
        debug!(collection = %self.collection, count = records.len(), "fetched all documents");
        Ok(Snapshot::from_records(records))
    }

    fn collection(&self) -> &CollectionRef {
        &self.collection
    }
}
