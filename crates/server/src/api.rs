//! Read-only consumer endpoints over the snapshot cache.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use feedstore_storage::{RecordTable, StoreError};

use crate::state::AppState;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn store_error(e: StoreError) -> ApiError {
    warn!(error = %e, "store read failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: e.to_string() }),
    )
}

// ── Health ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub started_at: String,
    pub cache: CacheStatus,
    pub config: serde_json::Value,
}

#[derive(Serialize)]
pub struct CacheStatus {
    pub populated: bool,
    pub hits: u64,
    pub misses: u64,
    pub max_age_secs: Option<u64>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at.to_rfc3339(),
        cache: CacheStatus {
            populated: state.cache.is_populated().await,
            hits: state.cache.hits(),
            misses: state.cache.misses(),
            max_age_secs: state.cache.max_age().map(|d| d.as_secs()),
        },
        config: state.config_summary.clone(),
    })
}

// ── Records ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    /// Serve the cached snapshot when one is held. Defaults to true.
    pub cached: Option<bool>,
}

/// `{"status":"empty"}` or `{"status":"ok","count":n,"columns":[..],"rows":[[..]]}`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecordsResponse {
    Empty,
    Ok {
        count: usize,
        columns: Vec<String>,
        rows: Vec<Vec<serde_json::Value>>,
    },
}

impl From<Option<RecordTable>> for RecordsResponse {
    fn from(table: Option<RecordTable>) -> Self {
        match table {
            None => RecordsResponse::Empty,
            Some(table) => RecordsResponse::Ok {
                count: table.rows.len(),
                columns: table.columns,
                rows: table.rows,
            },
        }
    }
}

pub async fn records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let table = state
        .cache
        .table(query.cached.unwrap_or(true))
        .await
        .map_err(store_error)?;
    Ok(Json(table.into()))
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub count: usize,
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>, ApiError> {
    let snapshot = state.cache.refresh().await.map_err(store_error)?;
    Ok(Json(RefreshResponse { count: snapshot.len() }))
}
