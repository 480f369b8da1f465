//! Raw payload to [`Record`] conversion.

mod chart;
mod grid;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use feedstore_core::{FieldValue, Record};

use crate::error::NormalizeError;
use crate::source::RawPayload;

pub use chart::{track_id_from_url, ChartNormalizer};
pub use grid::GridNormalizer;

/// Converts one payload into records, in source order.
///
/// Rows that cannot be parsed are dropped; an `Err` means the payload as a
/// whole was unusable.
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(&self, payload: &RawPayload) -> Result<Vec<Record>, NormalizeError>;

    /// Fields forming each record's identity key.
    fn key_fields(&self) -> &'static [&'static str];
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Integer when possible, otherwise a finite float.
pub(crate) fn parse_number(raw: &str) -> Option<FieldValue> {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Some(FieldValue::Integer(i));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(FieldValue::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedstore_core::format_timestamp;

    #[test]
    fn timestamp_forms() {
        for raw in ["01/01/2020 00:00", "2020-01-01T00:00", "2020-01-01 00:00", "2020-01-01T00:00:00"] {
            let ts = parse_timestamp(raw).unwrap();
            assert_eq!(format_timestamp(&ts), "2020-01-01T00:00", "{raw}");
        }
        assert_eq!(format_timestamp(&parse_timestamp("12/31/2019 23:55:10").unwrap()), "2019-12-31T23:55:10");
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2020-13-01T00:00").is_none());
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("150"), Some(FieldValue::Integer(150)));
        assert_eq!(parse_number(" -3 "), Some(FieldValue::Integer(-3)));
        assert_eq!(parse_number("1.5"), Some(FieldValue::Float(1.5)));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("n/a"), None);
    }
}
