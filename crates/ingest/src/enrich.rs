//! Per-track attribute lookup against the Spotify Web API.
//!
//! Tokens come from the client-credentials flow and are cached until shortly
//! before they expire.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use feedstore_core::config::SpotifyConfig;

use crate::error::EnrichError;

/// Genre recorded when the lookup itself failed.
pub const UNKNOWN_GENRE: &str = "unknown";

/// Genre recorded when the artist lists no genres.
pub const NO_GENRE: &str = "None";

/// Tokens are renewed this long before their stated expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackAttributes {
    pub genre: String,
    pub followers: Option<i64>,
}

impl TrackAttributes {
    /// Sentinel attributes for a row whose lookup failed or was not configured.
    pub fn unknown() -> Self {
        Self {
            genre: UNKNOWN_GENRE.to_string(),
            followers: None,
        }
    }
}

#[async_trait]
pub trait AttributeLookup: Send + Sync {
    async fn lookup(&self, track_id: &str) -> Result<TrackAttributes, EnrichError>;
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyLookup {
    client: Client,
    api_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct TrackResponse {
    artists: Vec<ArtistRef>,
}

#[derive(Deserialize)]
struct ArtistRef {
    id: String,
}

#[derive(Deserialize)]
struct ArtistResponse {
    #[serde(default)]
    genres: Vec<String>,
    followers: Option<Followers>,
}

#[derive(Deserialize)]
struct Followers {
    total: Option<i64>,
}

impl SpotifyLookup {
    pub fn new(
        api_url: impl Into<String>,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: Mutex::new(None),
        }
    }

    /// `None` when client credentials are not configured.
    pub fn from_config(config: &SpotifyConfig, timeout: Duration) -> Option<Self> {
        let client_id = config.client_id.as_deref()?;
        let client_secret = config.client_secret.as_deref()?;
        Some(Self::new(&config.api_url, &config.token_url, client_id, client_secret, timeout))
    }

    async fn access_token(&self) -> Result<String, EnrichError> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Api(format!("token request {status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "spotify access token issued");
        let value = token.access_token.clone();
        *slot = Some(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, EnrichError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{}/{}", self.api_url, path))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.token.lock().await.take();
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Api(format!("{path} {status}: {body}")));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AttributeLookup for SpotifyLookup {
    async fn lookup(&self, track_id: &str) -> Result<TrackAttributes, EnrichError> {
        let track: TrackResponse = self.get_json(&format!("tracks/{track_id}")).await?;
        let artist_id = track
            .artists
            .first()
            .map(|a| a.id.clone())
            .ok_or_else(|| EnrichError::NoArtist(track_id.to_string()))?;

        let artist: ArtistResponse = self.get_json(&format!("artists/{artist_id}")).await?;
        Ok(TrackAttributes {
            genre: artist
                .genres
                .into_iter()
                .next()
                .unwrap_or_else(|| NO_GENRE.to_string()),
            followers: artist.followers.and_then(|f| f.total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Calls {
        tokens: AtomicUsize,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "Bearer test-token")
    }

    async fn token(State(calls): State<Arc<Calls>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
        calls.tokens.fetch_add(1, Ordering::SeqCst);
        let basic = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or("");
        if !basic.starts_with("Basic ") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"})));
        }
        (StatusCode::OK, Json(json!({"access_token": "test-token", "token_type": "Bearer", "expires_in": 3600})))
    }

    async fn track(Path(id): Path<String>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({})));
        }
        match id.as_str() {
            "t1" => (StatusCode::OK, Json(json!({"id": "t1", "artists": [{"id": "a1"}, {"id": "a2"}]}))),
            "t2" => (StatusCode::OK, Json(json!({"id": "t2", "artists": [{"id": "a3"}]}))),
            "orphan" => (StatusCode::OK, Json(json!({"id": "orphan", "artists": []}))),
            _ => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
        }
    }

    async fn artist(Path(id): Path<String>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({})));
        }
        match id.as_str() {
            "a1" => (StatusCode::OK, Json(json!({"genres": ["dutch pop", "pop"], "followers": {"total": 1234}}))),
            "a3" => (StatusCode::OK, Json(json!({"genres": [], "followers": {"href": null, "total": 7}}))),
            _ => (StatusCode::NOT_FOUND, Json(json!({}))),
        }
    }

    async fn spotify() -> (SocketAddr, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let router = Router::new()
            .route("/api/token", post(token))
            .route("/v1/tracks/{id}", get(track))
            .route("/v1/artists/{id}", get(artist))
            .with_state(calls.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (addr, calls)
    }

    fn lookup(addr: SocketAddr) -> SpotifyLookup {
        SpotifyLookup::new(
            format!("http://{addr}/v1/"),
            format!("http://{addr}/api/token"),
            "id",
            "secret",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn first_genre_and_follower_total() {
        let (addr, _) = spotify().await;
        let attrs = lookup(addr).lookup("t1").await.unwrap();
        assert_eq!(
            attrs,
            TrackAttributes {
                genre: "dutch pop".into(),
                followers: Some(1234)
            }
        );
    }

    #[tokio::test]
    async fn artist_without_genres() {
        let (addr, _) = spotify().await;
        let attrs = lookup(addr).lookup("t2").await.unwrap();
        assert_eq!(attrs.genre, NO_GENRE);
        assert_eq!(attrs.followers, Some(7));
    }

    #[tokio::test]
    async fn token_is_reused_across_lookups() {
        let (addr, calls) = spotify().await;
        let lookup = lookup(addr);
        lookup.lookup("t1").await.unwrap();
        lookup.lookup("t2").await.unwrap();
        assert_eq!(calls.tokens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_track_is_an_error() {
        let (addr, _) = spotify().await;
        let err = lookup(addr).lookup("missing").await.unwrap_err();
        assert!(matches!(err, EnrichError::Api(_)));
    }

    #[tokio::test]
    async fn track_without_artists_is_an_error() {
        let (addr, _) = spotify().await;
        let err = lookup(addr).lookup("orphan").await.unwrap_err();
        assert!(matches!(err, EnrichError::NoArtist(id) if id == "orphan"));
    }

    #[test]
    fn from_config_requires_credentials() {
        let mut config = SpotifyConfig {
            client_id: Some("id".into()),
            client_secret: None,
            api_url: "https://api.spotify.com/v1".into(),
            token_url: "https://accounts.spotify.com/api/token".into(),
            delay_ms: 10,
        };
        assert!(SpotifyLookup::from_config(&config, Duration::from_secs(1)).is_none());
        config.client_secret = Some("secret".into());
        assert!(SpotifyLookup::from_config(&config, Duration::from_secs(1)).is_some());
    }
}
