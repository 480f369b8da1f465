use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use feedstore_core::{FieldValue, Record};

use super::Normalizer;
use crate::enrich::{AttributeLookup, TrackAttributes};
use crate::error::NormalizeError;
use crate::source::RawPayload;

const KEY_FIELDS: &[&str] = &["date", "position", "track_id"];

#[derive(Deserialize)]
struct ChartDocument {
    entries: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChartEntry {
    date: Option<String>,
    position: Option<i64>,
    track_name: Option<String>,
    artist: Option<String>,
    streams: Option<i64>,
    url: Option<String>,
}

/// Daily streaming chart entries, enriched with per-track attributes.
pub struct ChartNormalizer {
    lookup: Option<Arc<dyn AttributeLookup>>,
    delay: Duration,
}

impl ChartNormalizer {
    pub fn new(lookup: Option<Arc<dyn AttributeLookup>>, delay: Duration) -> Self {
        Self { lookup, delay }
    }

    async fn attributes(&self, track_id: &str) -> TrackAttributes {
        let Some(lookup) = self.lookup.as_ref() else {
            return TrackAttributes::unknown();
        };
        match lookup.lookup(track_id).await {
            Ok(attributes) => attributes,
            Err(e) => {
                warn!(track_id, error = %e, "attribute lookup failed, keeping row with unknown attributes");
                TrackAttributes::unknown()
            }
        }
    }
}

/// Track id from a `https://open.spotify.com/track/{id}` style URL.
pub fn track_id_from_url(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("/track/")?;
    rest.split(['/', '?', '#'])
        .next()
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl Normalizer for ChartNormalizer {
    async fn normalize(&self, payload: &RawPayload) -> Result<Vec<Record>, NormalizeError> {
        let document: ChartDocument = serde_json::from_str(&payload.body)?;

        let mut records = Vec::with_capacity(document.entries.len());
        let mut dropped = 0usize;
        let mut lookups = 0usize;
        for (index, value) in document.entries.into_iter().enumerate() {
            let entry: ChartEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(e) => {
                    dropped += 1;
                    debug!(index, error = %e, "dropping malformed chart entry");
                    continue;
                }
            };
            let date = entry
                .date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
            let track_id = entry.url.as_deref().and_then(track_id_from_url);
            let (Some(date), Some(position), Some(track_id)) = (date, entry.position, track_id) else {
                dropped += 1;
                debug!(url = ?entry.url, date = ?entry.date, "dropping chart entry without date, position or track id");
                continue;
            };
            let track_id = track_id.to_string();

            if self.lookup.is_some() && lookups > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let attributes = self.attributes(&track_id).await;
            lookups += 1;

            let text = |v: Option<String>| v.map(FieldValue::Text).unwrap_or(FieldValue::Null);
            let mut fields = IndexMap::new();
            fields.insert("date".to_string(), FieldValue::Text(date.format("%Y-%m-%d").to_string()));
            fields.insert("position".to_string(), FieldValue::Integer(position));
            fields.insert("track_name".to_string(), text(entry.track_name));
            fields.insert("artist".to_string(), text(entry.artist));
            fields.insert(
                "streams".to_string(),
                entry.streams.map(FieldValue::Integer).unwrap_or(FieldValue::Null),
            );
            fields.insert("url".to_string(), text(entry.url));
            fields.insert("track_id".to_string(), FieldValue::Text(track_id));
            fields.insert("genre".to_string(), FieldValue::Text(attributes.genre));
            fields.insert(
                "followers".to_string(),
                attributes.followers.map(FieldValue::Integer).unwrap_or(FieldValue::Null),
            );
            records.push(Record::new(KEY_FIELDS, fields)?);
        }

        debug!(rows = records.len(), dropped, "chart payload normalized");
        Ok(records)
    }

    fn key_fields(&self) -> &'static [&'static str] {
        KEY_FIELDS
    }
}
