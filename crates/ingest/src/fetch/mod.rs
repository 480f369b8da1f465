//! Network fetch: one attempt per [`Fetcher`] call, retries in [`RetryingFetcher`].

mod http;
mod retry;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::source::{RawPayload, SourceDescriptor};

pub use http::HttpFetcher;
pub use retry::{Backoff, RetryPolicy, RetryingFetcher};

/// Performs a single request against an upstream source.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_once(&self, source: &SourceDescriptor) -> Result<RawPayload, FetchError>;
}
