//! Document store contract, snapshot sentinel and tabular view.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexSet;
use serde::Serialize;

use feedstore_core::Record;

use crate::error::StoreError;

/// Logical address of a document collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub database: String,
    pub collection: String,
}

impl CollectionRef {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.database, self.collection)
    }
}

/// Matched-vs-inserted totals for one `upsert` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub rows: usize,
    pub updated: usize,
    pub inserted: usize,
}

impl UpsertSummary {
    pub(crate) fn record(&mut self, matched: bool) {
        self.rows += 1;
        if matched {
            self.updated += 1;
        } else {
            self.inserted += 1;
        }
    }
}

/// Persistence boundary for normalized records.
///
/// Writes are keyed strictly on [`Record::key`]; a record whose identity
/// already exists replaces the stored document in full.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Replace-if-identity-matches-else-insert for every record, in order.
    async fn upsert(&self, records: &[Record]) -> Result<UpsertSummary, StoreError>;

    /// Read every persisted record. Returns [`Snapshot::Empty`] when nothing is stored.
    async fn fetch_all(&self) -> Result<Snapshot, StoreError>;

    /// The collection this store writes to.
    fn collection(&self) -> &CollectionRef;
}

// ── Snapshot ──────────────────────────────────────────────────

/// A full read of the store at one point in time.
///
/// `Empty` is the "no data yet" sentinel, distinct from a read failure.
/// Populated snapshots are immutable and cheap to clone.
#[derive(Debug, Clone)]
pub enum Snapshot {
    Empty,
    Populated(Arc<[Record]>),
}

impl Snapshot {
    /// Build a snapshot ordered by identity key.
    pub fn from_records(mut records: Vec<Record>) -> Self {
        if records.is_empty() {
            return Snapshot::Empty;
        }
        records.sort_by(|a, b| a.key().compare(b.key()));
        Snapshot::Populated(records.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Snapshot::Empty)
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn records(&self) -> &[Record] {
        match self {
            Snapshot::Empty => &[],
            Snapshot::Populated(records) => records,
        }
    }

    /// Tabular view for consumers; `None` is the empty sentinel.
    pub fn to_table(&self) -> Option<RecordTable> {
        match self {
            Snapshot::Empty => None,
            Snapshot::Populated(records) => Some(RecordTable::from_records(records)),
        }
    }
}

/// Column-oriented rendering of a snapshot: columns in first-seen order,
/// one row per record, missing cells as null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl RecordTable {
    fn from_records(records: &[Record]) -> Self {
        let mut columns: IndexSet<&str> = IndexSet::new();
        for record in records {
            columns.extend(record.fields().keys().map(String::as_str));
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| {
                        record
                            .get(col)
                            .map(|v| v.to_json())
                            .unwrap_or(serde_json::Value::Null)
                    })
                    .collect()
            })
            .collect();

        Self {
            columns: columns.into_iter().map(str::to_string).collect(),
            rows,
        }
    }

    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&serde_json::Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}
