pub mod backend;
pub mod cache;
pub mod error;
pub mod memory;
pub mod object;
pub mod store;

#[cfg(test)]
mod conformance;

pub use backend::StorageBackend;
pub use cache::SnapshotCache;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use object::ObjectDocumentStore;
pub use store::{CollectionRef, DocumentStore, RecordTable, Snapshot, UpsertSummary};
