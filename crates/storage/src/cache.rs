use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{DocumentStore, RecordTable, Snapshot};

struct CachedSnapshot {
    snapshot: Snapshot,
    loaded_at: Instant,
}

/// Single-slot read cache in front of a [`DocumentStore`].
///
/// Only populated snapshots are retained; an empty store is re-read on every
/// call so the first ingested data shows up without a refresh.
pub struct SnapshotCache {
    store: Arc<dyn DocumentStore>,
    slot: RwLock<Option<CachedSnapshot>>,
    max_age: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SnapshotCache {
    /// Cache whose entries never expire.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_max_age(store, None)
    }

    pub fn with_max_age(store: Arc<dyn DocumentStore>, max_age: Option<Duration>) -> Self {
        Self {
            store,
            slot: RwLock::new(None),
            max_age,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Current snapshot. With `allow_cached` a live entry is returned without
    /// touching the store; otherwise the store is read and the slot replaced.
    pub async fn get(&self, allow_cached: bool) -> Result<Snapshot, StoreError> {
        if allow_cached {
            let slot = self.slot.read().await;
            if let Some(entry) = slot.as_ref().filter(|e| self.is_live(e)) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.snapshot.clone());
            }
        }

        let mut slot = self.slot.write().await;
        // Another caller may have filled the slot while we waited for the lock.
        if allow_cached {
            if let Some(entry) = slot.as_ref().filter(|e| self.is_live(e)) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.snapshot.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.store.fetch_all().await?;
        *slot = if snapshot.is_empty() {
            None
        } else {
            Some(CachedSnapshot {
                snapshot: snapshot.clone(),
                loaded_at: Instant::now(),
            })
        };
        debug!(
            collection = %self.store.collection(),
            count = snapshot.len(),
            allow_cached,
            "snapshot loaded from store"
        );
        Ok(snapshot)
    }

    /// Force a store read and replace the slot.
    pub async fn refresh(&self) -> Result<Snapshot, StoreError> {
        let snapshot = self.get(false).await?;
        info!(collection = %self.store.collection(), count = snapshot.len(), "cache refreshed");
        Ok(snapshot)
    }

    /// Drop the cached entry; the next read goes to the store.
    pub async fn invalidate(&self) {
        self.slot.write().await.take();
        debug!(collection = %self.store.collection(), "cache invalidated");
    }

    /// Tabular view for consumers. `None` means the store holds no data.
    pub async fn table(&self, allow_cached: bool) -> Result<Option<RecordTable>, StoreError> {
        Ok(self.get(allow_cached).await?.to_table())
    }

    pub async fn is_populated(&self) -> bool {
        self.slot.read().await.is_some()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    fn is_live(&self, entry: &CachedSnapshot) -> bool {
        match self.max_age {
            Some(max_age) => entry.loaded_at.elapsed() < max_age,
            None => true,
        }
    }
}
