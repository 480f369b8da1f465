use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::debug;

use feedstore_core::config::GridConfig;
use feedstore_core::{FieldValue, Record};

use super::{parse_number, parse_timestamp, Normalizer};
use crate::error::NormalizeError;
use crate::source::RawPayload;

/// Timestamp column as named in the feed header.
pub const SOURCE_TIMESTAMP_COLUMN: &str = "Date/Time";

/// Timestamp field as stored.
pub const TIMESTAMP_FIELD: &str = "Datetime";

const KEY_FIELDS: &[&str] = &[TIMESTAMP_FIELD];

/// Tab-delimited grid power-flow feed: description lines, a header row, then
/// one row per interval.
pub struct GridNormalizer {
    header_lines: usize,
}

impl GridNormalizer {
    pub fn new(header_lines: usize) -> Self {
        Self { header_lines }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.header_lines)
    }

    pub fn parse(&self, body: &str) -> Result<Vec<Record>, NormalizeError> {
        let mut lines = body.lines().skip(self.header_lines);
        let header = lines
            .by_ref()
            .find(|line| !line.trim().is_empty())
            .ok_or(NormalizeError::MissingHeader(self.header_lines))?;

        let columns: Vec<String> = header
            .split('\t')
            .map(|name| match name.trim() {
                SOURCE_TIMESTAMP_COLUMN => TIMESTAMP_FIELD.to_string(),
                other => other.to_string(),
            })
            .collect();
        let ts_index = columns
            .iter()
            .position(|c| c == TIMESTAMP_FIELD)
            .ok_or_else(|| NormalizeError::MissingColumn(SOURCE_TIMESTAMP_COLUMN.to_string()))?;

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for line in lines.filter(|line| !line.trim().is_empty()) {
            match parse_row(&columns, ts_index, line) {
                Some(record) => records.push(record),
                None => {
                    dropped += 1;
                    debug!(row = line, "dropping malformed grid row");
                }
            }
        }

        debug!(rows = records.len(), dropped, "grid payload normalized");
        Ok(records)
    }
}

/// `None` when any cell is missing, blank or unparseable.
fn parse_row(columns: &[String], ts_index: usize, line: &str) -> Option<Record> {
    let cells: Vec<&str> = line.split('\t').collect();
    if cells.len() != columns.len() {
        return None;
    }

    let mut fields = IndexMap::with_capacity(columns.len());
    for (i, (column, cell)) in columns.iter().zip(cells).enumerate() {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        let value = if i == ts_index {
            FieldValue::Timestamp(parse_timestamp(cell)?)
        } else {
            parse_number(cell)?
        };
        fields.insert(column.clone(), value);
    }
    Record::new(KEY_FIELDS, fields).ok()
}

#[async_trait]
impl Normalizer for GridNormalizer {
    async fn normalize(&self, payload: &RawPayload) -> Result<Vec<Record>, NormalizeError> {
        self.parse(&payload.body)
    }

    fn key_fields(&self) -> &'static [&'static str] {
        KEY_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Date/Time\tWind\tHydro\tFossil/Biomass\tNuclear\tLoad";

    fn feed(rows: &[&str]) -> String {
        let mut body = String::new();
        for i in 0..11 {
            body.push_str(&format!("BPA Balancing Authority description line {i}\n"));
        }
        body.push_str(HEADER);
        body.push('\n');
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        body
    }

    #[test]
    fn single_row_keyed_by_datetime() {
        let records = GridNormalizer::new(11)
            .parse(&feed(&["2020-01-01T00:00\t100\t50\t30\t20\t150"]))
            .unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.key().canonical(), "2020-01-01T00:00");
        assert_eq!(
            record.fields().keys().collect::<Vec<_>>(),
            vec!["Datetime", "Wind", "Hydro", "Fossil/Biomass", "Nuclear", "Load"]
        );
        assert_eq!(record.get("Wind"), Some(&FieldValue::Integer(100)));
        assert_eq!(record.get("Load"), Some(&FieldValue::Integer(150)));
    }

    #[test]
    fn feed_date_format_is_canonicalized() {
        let records = GridNormalizer::new(11)
            .parse(&feed(&["01/02/2020 13:05\t1200.5\t8000\t900\t1100\t6000"]))
            .unwrap();
        assert_eq!(records[0].key().canonical(), "2020-01-02T13:05");
        assert_eq!(records[0].get("Wind"), Some(&FieldValue::Float(1200.5)));
    }

    #[test]
    fn malformed_rows_are_dropped() {
        let records = GridNormalizer::new(11)
            .parse(&feed(&[
                "01/01/2020 00:00\t1\t2\t3\t4\t5",
                "01/01/2020 00:05\t1\t\t3\t4\t5",
                "01/01/2020 00:10\t1\t2\t3",
                "not a date\t1\t2\t3\t4\t5",
                "01/01/2020 00:15\t1\tn/a\t3\t4\t5",
                "",
                "01/01/2020 00:20\t1\t2\t3\t4\t5",
            ]))
            .unwrap();
        let keys: Vec<String> = records.iter().map(|r| r.key().canonical()).collect();
        assert_eq!(keys, vec!["2020-01-01T00:00", "2020-01-01T00:20"]);
    }

    #[test]
    fn column_names_are_trimmed() {
        let body = format!("{}\n Date/Time \t Wind \n01/01/2020 00:00\t7\n", "desc\n".repeat(11).trim_end());
        let records = GridNormalizer::new(11).parse(&body).unwrap();
        assert_eq!(records[0].get("Wind"), Some(&FieldValue::Integer(7)));
    }

    #[test]
    fn crlf_line_endings() {
        let body = feed(&["01/01/2020 00:00\t1\t2\t3\t4\t5"]).replace('\n', "\r\n");
        assert_eq!(GridNormalizer::new(11).parse(&body).unwrap().len(), 1);
    }

    #[test]
    fn header_only_yields_no_records() {
        assert!(GridNormalizer::new(11).parse(&feed(&[])).unwrap().is_empty());
    }

    #[test]
    fn missing_header_is_a_schema_error() {
        let body = "only\nthree\nlines\n";
        assert!(matches!(
            GridNormalizer::new(11).parse(body),
            Err(NormalizeError::MissingHeader(11))
        ));
    }

    #[test]
    fn missing_timestamp_column_is_a_schema_error() {
        let body = feed(&[]).replace("Date/Time", "When");
        assert!(matches!(
            GridNormalizer::new(11).parse(&body),
            Err(NormalizeError::MissingColumn(c)) if c == "Date/Time"
        ));
    }
}
