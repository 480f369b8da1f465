use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::Fetcher;
use crate::error::FetchError;
use crate::source::{RawPayload, SourceDescriptor};

/// HTTP GET with a per-attempt timeout. Non-2xx statuses count as failures.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_once(&self, source: &SourceDescriptor) -> Result<RawPayload, FetchError> {
        let response = self
            .client
            .get(&source.url)
            .query(&source.query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: source.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(source = %source.name, bytes = body.len(), "payload fetched");
        Ok(RawPayload::new(&source.name, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn descriptor(addr: SocketAddr, path: &str, query: &[(&str, &str)]) -> SourceDescriptor {
        SourceDescriptor {
            name: "test".into(),
            url: format!("http://{addr}{path}"),
            query: query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let addr = serve(Router::new().route("/feed.txt", get(|| async { "line one\nline two" }))).await;
        let fetcher = HttpFetcher::new(Duration::from_secs(5));

        let payload = fetcher.fetch_once(&descriptor(addr, "/feed.txt", &[])).await.unwrap();
        assert_eq!(payload.body, "line one\nline two");
        assert_eq!(payload.source, "test");
    }

    #[tokio::test]
    async fn sends_query_parameters() {
        let router = Router::new().route(
            "/charts",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                format!("{}:{}:{}", params["region"], params["start"], params["end"])
            }),
        );
        let addr = serve(router).await;
        let fetcher = HttpFetcher::new(Duration::from_secs(5));

        let source = descriptor(addr, "/charts", &[("region", "nl"), ("start", "2020-01-01"), ("end", "2020-01-07")]);
        let payload = fetcher.fetch_once(&source).await.unwrap();
        assert_eq!(payload.body, "nl:2020-01-01:2020-01-07");
    }

    #[tokio::test]
    async fn error_status_is_a_failed_attempt() {
        let router = Router::new().route("/feed.txt", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }));
        let addr = serve(router).await;
        let fetcher = HttpFetcher::new(Duration::from_secs(5));

        let err = fetcher.fetch_once(&descriptor(addr, "/feed.txt", &[])).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );
        let addr = serve(router).await;
        let fetcher = HttpFetcher::new(Duration::from_millis(50));

        let err = fetcher.fetch_once(&descriptor(addr, "/slow", &[])).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(e) if e.is_timeout()));
    }
}
