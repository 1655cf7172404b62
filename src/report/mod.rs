//! Registration Report Builder
//!
//! Turns raw registration records into the view model handed to the
//! presentation layer:
//!
//! 1. Each record becomes a [`ReportRow`] with a formatted date and time
//! 2. Rows are stably sorted by their registration instant
//! 3. Rows are counted per formatted date, in first-encounter order
//!
//! The pipeline is a pure function of its input and the [`DateFormatter`].

pub mod format;

pub use format::{
    parse_timestamp, parse_timestamp_str, DateFormatter, FormatError, Locale, TimeZoneSetting,
    INVALID_DATE,
};

use crate::source::Document;
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Names of the document fields the report reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    /// National identity document field
    pub identity: String,
    /// Registration timestamp field
    pub timestamp: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            identity: "dni".to_string(),
            timestamp: "registrationDate".to_string(),
        }
    }
}

/// A registration entry as delivered by the data source
#[derive(Debug, Clone, PartialEq)]
pub struct RawRegistrationRecord {
    pub id: String,
    pub identity: Option<String>,
    pub timestamp: Option<Value>,
    /// Remaining document fields, untouched
    pub extra: Map<String, Value>,
}

impl RawRegistrationRecord {
    pub fn new(id: impl Into<String>, identity: Option<&str>, timestamp: Option<&str>) -> Self {
        Self {
            id: id.into(),
            identity: identity.map(str::to_string),
            timestamp: timestamp.map(|ts| Value::String(ts.to_string())),
            extra: Map::new(),
        }
    }

    /// Split a document into the fields the report reads and the rest.
    ///
    /// A numeric identity is rendered as its decimal form; null or
    /// structured identities count as absent.
    pub fn from_document(doc: Document, fields: &FieldNames) -> Self {
        let mut extra = doc.fields;

        let identity = match extra.shift_remove(&fields.identity) {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };

        let timestamp = extra
            .shift_remove(&fields.timestamp)
            .filter(|v| !v.is_null());

        Self {
            id: doc.id,
            identity,
            timestamp,
            extra,
        }
    }
}

/// Keys a row sets itself; document fields with these names are dropped
pub const ROW_KEYS: [&str; 5] = ["id", "identity", "date", "time", "timestamp"];

/// A record after date/time formatting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub id: String,
    pub identity: String,
    pub date: String,
    pub time: String,
    /// Raw timestamp as received
    pub timestamp: Option<Value>,
    #[serde(skip)]
    pub instant: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportRow {
    /// Derive a row from a record using a fixed formatter
    pub fn derive(record: RawRegistrationRecord, formatter: &DateFormatter) -> Self {
        let instant = record.timestamp.as_ref().and_then(parse_timestamp);

        if instant.is_none() {
            tracing::warn!(
                id = %record.id,
                timestamp = ?record.timestamp,
                "Registration has no valid timestamp"
            );
        }

        let mut extra = record.extra;
        for key in ROW_KEYS {
            if extra.shift_remove(key).is_some() {
                tracing::debug!(id = %record.id, field = key, "Dropped document field shadowed by row");
            }
        }

        Self {
            date: formatter.format_date(instant.as_ref()),
            time: formatter.format_time(instant.as_ref()),
            id: record.id,
            identity: record.identity.unwrap_or_default(),
            timestamp: record.timestamp,
            instant,
            extra,
        }
    }

    pub fn has_valid_timestamp(&self) -> bool {
        self.instant.is_some()
    }
}

/// Chronological order; rows without a valid instant go last
fn compare_instants(a: &Option<DateTime<Utc>>, b: &Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Registration count per formatted date, in first-encounter order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayCounts {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl DayCounts {
    pub fn new() -> Self {
        Self::default()
    }

    fn increment(&mut self, date: &str) {
        match self.index.get(date) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.index.insert(date.to_string(), self.entries.len());
                self.entries.push((date.to_string(), 1));
            }
        }
    }

    pub fn get(&self, date: &str) -> Option<usize> {
        self.index.get(date).map(|&pos| self.entries[pos].1)
    }

    /// Number of distinct days
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(date, count)| (date.as_str(), *count))
    }
}

impl Serialize for DayCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (date, count) in &self.entries {
            map.serialize_entry(date, count)?;
        }
        map.end()
    }
}

/// The view model: sorted rows plus per-day counts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub counts: DayCounts,
}

impl Report {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose timestamp could not be parsed
    pub fn invalid_rows(&self) -> usize {
        self.rows.iter().filter(|r| !r.has_valid_timestamp()).count()
    }
}

/// Build the report for a batch of records.
///
/// Never fails: records with a missing or malformed timestamp are kept,
/// rendered as [`INVALID_DATE`], sorted after every valid row and counted
/// in their own bucket.
pub fn build_report<I>(records: I, formatter: &DateFormatter) -> Report
where
    I: IntoIterator<Item = RawRegistrationRecord>,
{
    let mut rows: Vec<ReportRow> = records
        .into_iter()
        .map(|record| ReportRow::derive(record, formatter))
        .collect();

    // Vec::sort_by is stable
    rows.sort_by(|a, b| compare_instants(&a.instant, &b.instant));

    let mut counts = DayCounts::new();
    for row in &rows {
        counts.increment(&row.date);
    }

    Report { rows, counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, dni: &str, ts: &str) -> RawRegistrationRecord {
        RawRegistrationRecord::new(id, Some(dni), Some(ts))
    }

    fn ids(report: &Report) -> Vec<&str> {
        report.rows.iter().map(|r| r.id.as_str()).collect()
    }

    fn sample() -> Vec<RawRegistrationRecord> {
        vec![
            record("a", "111", "2024-01-05T10:00:00Z"),
            record("b", "222", "2024-01-05T09:00:00Z"),
            record("c", "333", "2024-01-06T08:00:00Z"),
        ]
    }

    #[test]
    fn test_sorts_and_counts_by_day() {
        let report = build_report(sample(), &DateFormatter::default());

        assert_eq!(ids(&report), vec!["b", "a", "c"]);
        assert_eq!(report.counts.get("January 5, 2024"), Some(2));
        assert_eq!(report.counts.get("January 6, 2024"), Some(1));
        assert_eq!(
            report.counts.iter().collect::<Vec<_>>(),
            vec![("January 5, 2024", 2), ("January 6, 2024", 1)]
        );

        let first = &report.rows[0];
        assert_eq!(first.identity, "222");
        assert_eq!(first.date, "January 5, 2024");
        assert_eq!(first.time, "9:00:00 AM");
        assert_eq!(first.timestamp, Some(json!("2024-01-05T09:00:00Z")));
    }

    #[test]
    fn test_empty_input() {
        let report = build_report(Vec::new(), &DateFormatter::default());
        assert!(report.is_empty());
        assert!(report.counts.is_empty());
        assert_eq!(report.counts.total(), 0);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let records = vec![
            record("late", "1", "2024-02-01T12:00:00Z"),
            record("first", "2", "2024-02-01T08:00:00Z"),
            record("second", "3", "2024-02-01T08:00:00Z"),
            record("third", "4", "2024-02-01T08:00:00+00:00"),
        ];
        let report = build_report(records, &DateFormatter::default());

        assert_eq!(ids(&report), vec!["first", "second", "third", "late"]);
    }

    #[test]
    fn test_malformed_timestamp_is_kept() {
        let records = vec![
            record("bad", "1", "yesterday-ish"),
            RawRegistrationRecord::new("missing", Some("2"), None),
            record("good", "3", "2024-03-10T10:00:00Z"),
        ];
        let report = build_report(records, &DateFormatter::default());

        assert_eq!(report.len(), 3);
        assert_eq!(ids(&report), vec!["good", "bad", "missing"]);
        assert_eq!(report.rows[1].date, INVALID_DATE);
        assert_eq!(report.rows[1].time, INVALID_DATE);
        assert_eq!(report.counts.get(INVALID_DATE), Some(2));
        assert_eq!(report.counts.get("March 10, 2024"), Some(1));
        assert_eq!(report.invalid_rows(), 2);
    }

    #[test]
    fn test_missing_identity_is_empty() {
        let records = vec![RawRegistrationRecord::new("x", None, Some("2024-01-01T00:00:00Z"))];
        let report = build_report(records, &DateFormatter::default());
        assert_eq!(report.rows[0].identity, "");
    }

    #[test]
    fn test_counts_match_rows() {
        let mut records = sample();
        records.push(record("d", "444", "2024-01-06T23:59:59Z"));
        records.push(record("e", "555", "garbage"));
        records.push(record("f", "666", "2023-12-31T23:00:00Z"));

        let total = records.len();
        let report = build_report(records, &DateFormatter::default());

        assert_eq!(report.len(), total);
        assert_eq!(report.counts.total(), total);
        for (date, count) in report.counts.iter() {
            let rows = report.rows.iter().filter(|r| r.date == date).count();
            assert_eq!(rows, count, "bucket {}", date);
        }
        for row in &report.rows {
            assert!(report.counts.get(&row.date).is_some());
        }
    }

    #[test]
    fn test_deterministic() {
        let formatter = DateFormatter::new(Locale::EsEs, "-03:00".parse().unwrap());
        let first = build_report(sample(), &formatter);
        let second = build_report(sample(), &formatter);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_timezone_changes_buckets() {
        // 02:00Z on the 6th is still the 5th in UTC-3
        let records = vec![
            record("a", "1", "2024-01-05T20:00:00Z"),
            record("b", "2", "2024-01-06T02:00:00Z"),
        ];
        let formatter = DateFormatter::new(Locale::EnUs, "-03:00".parse().unwrap());
        let report = build_report(records, &formatter);

        assert_eq!(report.counts.len(), 1);
        assert_eq!(report.counts.get("January 5, 2024"), Some(2));
    }

    #[test]
    fn test_from_document() {
        let fields = FieldNames::default();
        let doc = Document::new(
            "u1",
            json!({
                "dni": 30111222,
                "registrationDate": "2024-01-05T10:00:00Z",
                "name": "Ana"
            }),
        );

        let record = RawRegistrationRecord::from_document(doc, &fields);
        assert_eq!(record.id, "u1");
        assert_eq!(record.identity.as_deref(), Some("30111222"));
        assert_eq!(record.timestamp, Some(json!("2024-01-05T10:00:00Z")));
        assert_eq!(record.extra.get("name"), Some(&json!("Ana")));
        assert!(!record.extra.contains_key("dni"));
    }

    #[test]
    fn test_document_fields_do_not_shadow_row_fields() {
        let doc = Document::new(
            "u1",
            json!({
                "dni": "1",
                "registrationDate": "2024-01-05T10:00:00Z",
                "date": "legacy",
                "timestamp": 0,
                "id": "other",
                "name": "Ana"
            }),
        );
        let record = RawRegistrationRecord::from_document(doc, &FieldNames::default());
        let report = build_report(vec![record], &DateFormatter::default());

        let row = &report.rows[0];
        assert!(row.extra.keys().all(|k| !ROW_KEYS.contains(&k.as_str())));
        assert_eq!(row.extra.get("name"), Some(&json!("Ana")));

        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json.matches("\"date\"").count(), 1);
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows"][0]["date"], "January 5, 2024");
        assert_eq!(value["rows"][0]["id"], "u1");
        assert_eq!(value["rows"][0]["timestamp"], "2024-01-05T10:00:00Z");
    }

    #[test]
    fn test_serialized_counts_keep_order() {
        let records = vec![
            record("z", "1", "2024-05-02T10:00:00Z"),
            record("y", "2", "2024-05-01T10:00:00Z"),
        ];
        let report = build_report(records, &DateFormatter::default());
        let json = serde_json::to_string(&report.counts).unwrap();

        assert_eq!(json, r#"{"May 1, 2024":1,"May 2, 2024":1}"#);
    }
}
