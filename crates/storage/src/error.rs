use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document decode error at {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },

    #[error("document encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("not configured: {0}")]
    NotConfigured(String),
}
