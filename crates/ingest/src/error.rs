use thiserror::Error;

use feedstore_core::CoreError;
use feedstore_storage::StoreError;

/// A single failed fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Payload-level normalization failure. Malformed rows are dropped, not reported here.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no header line after {0} description lines")]
    MissingHeader(usize),

    #[error("required column '{0}' not found in header")]
    MissingColumn(String),

    #[error("payload is not a chart document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("track {0} has no artists")]
    NoArtist(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown source '{0}' (expected grid or chart)")]
    UnknownSource(String),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
