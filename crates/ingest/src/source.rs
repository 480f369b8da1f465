//! Configured upstream sources and the per-cycle request descriptor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};

use feedstore_core::config::{ChartConfig, GridConfig};

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Grid,
    Chart,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Grid => "grid",
            SourceKind::Chart => "chart",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" | "bpa" => Ok(SourceKind::Grid),
            "chart" | "spotify" => Ok(SourceKind::Chart),
            other => Err(IngestError::UnknownSource(other.to_string())),
        }
    }
}

/// An upstream source bound to its configuration.
#[derive(Debug, Clone)]
pub enum IngestSource {
    Grid(GridConfig),
    Chart(ChartConfig),
}

impl IngestSource {
    pub fn from_config(kind: SourceKind, config: &feedstore_core::Config) -> Self {
        match kind {
            SourceKind::Grid => IngestSource::Grid(config.grid.clone()),
            SourceKind::Chart => IngestSource::Chart(config.chart.clone()),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            IngestSource::Grid(_) => SourceKind::Grid,
            IngestSource::Chart(_) => SourceKind::Chart,
        }
    }

    /// What to request for a cycle running on `today`.
    ///
    /// The chart window is `[today - window_days, today]`, recomputed every cycle.
    pub fn descriptor(&self, today: NaiveDate) -> SourceDescriptor {
        match self {
            IngestSource::Grid(grid) => SourceDescriptor {
                name: SourceKind::Grid.as_str().to_string(),
                url: grid.url.clone(),
                query: Vec::new(),
            },
            IngestSource::Chart(chart) => {
                let start = today
                    .checked_sub_days(Days::new(chart.window_days as u64))
                    .unwrap_or(today);
                SourceDescriptor {
                    name: SourceKind::Chart.as_str().to_string(),
                    url: chart.url.clone(),
                    query: vec![
                        ("region".to_string(), chart.region.clone()),
                        ("start".to_string(), start.format("%Y-%m-%d").to_string()),
                        ("end".to_string(), today.format("%Y-%m-%d").to_string()),
                    ],
                }
            }
        }
    }
}

/// Location and parameters of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    pub query: Vec<(String, String)>,
}

/// Text retrieved by one successful fetch attempt.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub source: String,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl RawPayload {
    pub fn new(source: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }
}
