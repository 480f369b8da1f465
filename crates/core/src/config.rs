use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    match profiled_env_opt(profile, key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparseable config value, using default");
            default
        }),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub aws: AwsConfig,
    pub fetch: FetchConfig,
    pub schedule: ScheduleConfig,
    pub grid: GridConfig,
    pub chart: ChartConfig,
    pub spotify: SpotifyConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `FEEDSTORE_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("FEEDSTORE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            aws: AwsConfig::from_env_profiled(p),
            fetch: FetchConfig::from_env_profiled(p),
            schedule: ScheduleConfig::from_env_profiled(p),
            grid: GridConfig::from_env_profiled(p),
            chart: ChartConfig::from_env_profiled(p),
            spotify: SpotifyConfig::from_env_profiled(p),
            cache: CacheConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  storage:   data_dir={}, collection={}/{}",
            self.storage.data_dir.display(),
            self.storage.database,
            self.storage.collection
        );
        tracing::info!("  aws:       region={}, bucket={}", self.aws.region, self.aws.s3_bucket.as_deref().unwrap_or("(none)"));
        tracing::info!(
            "  fetch:     attempts={}, timeout={}ms, backoff={}",
            self.fetch.max_attempts,
            self.fetch.timeout_ms,
            self.fetch.backoff
        );
        tracing::info!("  schedule:  source={}, every {}s", self.schedule.source, self.schedule.interval_secs);
        tracing::info!("  grid:      url={}", self.grid.url);
        tracing::info!("  chart:     url={}, region={}", self.chart.url, self.chart.region);
        tracing::info!("  spotify:   configured={}", self.spotify.is_configured());
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "storage": {
                "database": self.storage.database,
                "collection": self.storage.collection,
                "remote": self.aws.is_configured(),
            },
            "schedule": {
                "source": self.schedule.source,
                "interval_secs": self.schedule.interval_secs,
            },
            "fetch": {
                "max_attempts": self.fetch.max_attempts,
                "timeout_ms": self.fetch.timeout_ms,
                "backoff": self.fetch.backoff,
            },
            "spotify": { "configured": self.spotify.is_configured() },
            "cache": { "max_age_secs": self.cache.max_age_secs },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 3001),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Logical database name (first path segment of every document).
    pub database: String,
    pub collection: String,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            database: profiled_env_or(p, "STORE_DATABASE", "energy"),
            collection: profiled_env_or(p, "STORE_COLLECTION", "energy"),
        }
    }
}

// ── AWS / S3 ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_or(p, "AWS_REGION", "us-west-2"),
            access_key_id: profiled_env_opt(p, "AWS_ACCESS_KEY_ID"),
            secret_access_key: profiled_env_opt(p, "AWS_SECRET_ACCESS_KEY"),
            session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
            s3_bucket: profiled_env_opt(p, "S3_BUCKET"),
            s3_prefix: profiled_env_opt(p, "S3_PREFIX"),
            endpoint_url: profiled_env_opt(p, "AWS_ENDPOINT_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.access_key_id.is_some() && self.s3_bucket.is_some()
    }
}

// ── Fetch / retry ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub timeout_ms: u64,
    /// "none", "constant", "exponential"
    pub backoff: String,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
}

impl FetchConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_attempts: profiled_env_parse(p, "FETCH_MAX_ATTEMPTS", 5),
            timeout_ms: profiled_env_parse(p, "FETCH_TIMEOUT_MS", 500),
            backoff: profiled_env_or(p, "FETCH_BACKOFF", "none"),
            backoff_initial_ms: profiled_env_parse(p, "FETCH_BACKOFF_INITIAL_MS", 200),
            backoff_max_ms: profiled_env_parse(p, "FETCH_BACKOFF_MAX_MS", 2000),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── Schedule ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// "grid" or "chart"
    pub source: String,
    pub interval_secs: u64,
}

impl ScheduleConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            source: profiled_env_or(p, "INGEST_SOURCE", "grid"),
            interval_secs: profiled_env_parse(p, "INGEST_INTERVAL_SECS", 3600),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

// ── Grid feed ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub url: String,
    /// Description lines preceding the column header row.
    pub header_lines: usize,
}

impl GridConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(
                p,
                "GRID_URL",
                "https://transmission.bpa.gov/business/operations/Wind/baltwg.txt",
            ),
            header_lines: profiled_env_parse(p, "GRID_HEADER_LINES", 11),
        }
    }
}

// ── Chart feed ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    pub url: String,
    pub region: String,
    /// Days before today included in each fetch window.
    pub window_days: u32,
}

impl ChartConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "CHART_URL", "http://localhost:8080/charts/daily"),
            region: profiled_env_or(p, "CHART_REGION", "nl"),
            window_days: profiled_env_parse(p, "CHART_WINDOW_DAYS", 6),
        }
    }
}

// ── Spotify enrichment ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_url: String,
    pub token_url: String,
    /// Pause between sequential lookups.
    pub delay_ms: u64,
}

impl SpotifyConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            client_id: profiled_env_opt(p, "SPOTIFY_CLIENT_ID"),
            client_secret: profiled_env_opt(p, "SPOTIFY_CLIENT_SECRET"),
            api_url: profiled_env_or(p, "SPOTIFY_API_URL", "https://api.spotify.com/v1"),
            token_url: profiled_env_or(p, "SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token"),
            delay_ms: profiled_env_parse(p, "ENRICH_DELAY_MS", 10),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

// ── Read cache ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Unset = cached snapshots never expire.
    pub max_age_secs: Option<u64>,
}

impl CacheConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_age_secs: profiled_env_opt(p, "CACHE_MAX_AGE_SECS").and_then(|v| v.parse().ok()),
        }
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}
