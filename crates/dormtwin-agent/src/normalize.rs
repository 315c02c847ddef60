//! Result normalization: backend rows -> uniform records.
//!
//! Records keep the backend's column order, values are one of
//! string / number / boolean / null, and the row count is capped so a single
//! tool result cannot flood the conversation.

use chrono::{DateTime, SecondsFormat};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::backend::{Backend, RawResultSet};

/// A scalar cell value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

/// One row: ordered `(column, value)` pairs. Serializes as a JSON object in
/// column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    pub fn new(fields: Vec<(String, Scalar)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Scalar)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Normalized tool output.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct NormalizedRows {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    /// Row count before truncation.
    pub total_rows: usize,
    pub truncated: bool,
}

impl NormalizedRows {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<&NormalizedRows> for RawResultSet {
    fn from(rows: &NormalizedRows) -> Self {
        RawResultSet {
            columns: rows.columns.clone(),
            rows: rows
                .records
                .iter()
                .map(|r| r.fields.iter().map(|(_, v)| v.to_value()).collect())
                .collect(),
        }
    }
}

/// Normalize `raw` into at most `max_rows` records.
pub fn normalize(raw: &RawResultSet, backend: Backend, max_rows: usize) -> NormalizedRows {
    let total_rows = raw.rows.len();
    let truncated = total_rows > max_rows;
    let width = raw.columns.len();

    let records = raw
        .rows
        .iter()
        .take(max_rows)
        .map(|row| {
            if row.len() != width {
                tracing::debug!(
                    expected = width,
                    got = row.len(),
                    "Row width differs from column count"
                );
            }
            let fields = raw
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let value = row.get(i).unwrap_or(&Value::Null);
                    (col.clone(), coerce(value, col, backend))
                })
                .collect();
            Record { fields }
        })
        .collect();

    if truncated {
        tracing::debug!(backend = %backend, total_rows, max_rows, "Truncated result set");
    }

    NormalizedRows {
        columns: raw.columns.clone(),
        records,
        total_rows,
        truncated,
    }
}

/// Coerce a backend value to a scalar. Nested values (graph nodes, lists,
/// maps) become their compact JSON text.
fn coerce(value: &Value, column: &str, backend: Backend) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Bool(*b),
        Value::Number(n) => {
            if backend == Backend::Series && is_time_column(column) {
                if let Some(ts) = n.as_i64().and_then(epoch_nanos_to_rfc3339) {
                    return Scalar::String(ts);
                }
            }
            Scalar::Number(n.clone())
        }
        Value::String(s) => Scalar::String(s.clone()),
        Value::Array(_) | Value::Object(_) => Scalar::String(value.to_string()),
    }
}

fn is_time_column(column: &str) -> bool {
    let lower = column.to_lowercase();
    lower == "time" || lower.ends_with("_time") || lower.ends_with("_bucket")
}

/// Series timestamps sometimes arrive as epoch nanoseconds.
fn epoch_nanos_to_rfc3339(nanos: i64) -> Option<String> {
    const NANOS_PER_SEC: i64 = 1_000_000_000;
    let secs = nanos.div_euclid(NANOS_PER_SEC);
    let sub = nanos.rem_euclid(NANOS_PER_SEC) as u32;
    DateTime::from_timestamp(secs, sub).map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(columns: &[&str], rows: Vec<Vec<Value>>) -> RawResultSet {
        RawResultSet::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn test_field_order_matches_columns() {
        let set = raw(&["unit_id", "room_number"], vec![vec![json!("AC-1"), json!("103")]]);
        let out = normalize(&set, Backend::Graph, 20);
        let names: Vec<&str> = out.records[0].fields().iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["unit_id", "room_number"]);
        assert_eq!(
            serde_json::to_string(&out.records[0]).unwrap(),
            r#"{"unit_id":"AC-1","room_number":"103"}"#
        );
    }

    #[test]
    fn test_rich_values_become_scalars() {
        let set = raw(
            &["s", "labels", "ok", "missing"],
            vec![vec![json!({"sensor_id": "TEMP-101"}), json!(["TemperatureSensor"]), json!(true), Value::Null]],
        );
        let out = normalize(&set, Backend::Graph, 20);
        let rec = &out.records[0];
        assert_eq!(rec.get("s"), Some(&Scalar::String(r#"{"sensor_id":"TEMP-101"}"#.to_string())));
        assert_eq!(rec.get("labels"), Some(&Scalar::String(r#"["TemperatureSensor"]"#.to_string())));
        assert_eq!(rec.get("ok"), Some(&Scalar::Bool(true)));
        assert_eq!(rec.get("missing"), Some(&Scalar::Null));
    }

    #[test]
    fn test_series_epoch_time_becomes_string() {
        let set = raw(&["time", "reading"], vec![vec![json!(1_700_000_000_000_000_000i64), json!(21.5)]]);
        let out = normalize(&set, Backend::Series, 20);
        assert_eq!(out.records[0].get("time").and_then(|s| s.as_str()), Some("2023-11-14T22:13:20Z"));
        assert_eq!(out.records[0].get("reading"), Some(&Scalar::Number(serde_json::Number::from_f64(21.5).unwrap())));

        // Graph numbers in a "time" column stay numbers.
        let out = normalize(&set, Backend::Graph, 20);
        assert!(matches!(out.records[0].get("time"), Some(Scalar::Number(_))));
    }

    #[test]
    fn test_truncation_marker() {
        let rows = (0..25).map(|i| vec![json!(i)]).collect();
        let out = normalize(&raw(&["n"], rows), Backend::Series, 20);
        assert_eq!(out.len(), 20);
        assert_eq!(out.total_rows, 25);
        assert!(out.truncated);

        let rows = (0..20).map(|i| vec![json!(i)]).collect();
        let out = normalize(&raw(&["n"], rows), Backend::Series, 20);
        assert!(!out.truncated);
    }

    #[test]
    fn test_empty_result_is_empty_sequence() {
        let out = normalize(&raw(&["unit_id"], vec![]), Backend::Graph, 20);
        assert!(out.is_empty());
        assert!(!out.truncated);
        assert_eq!(out.total_rows, 0);
    }

    #[test]
    fn test_short_rows_padded_with_null() {
        let out = normalize(&raw(&["a", "b"], vec![vec![json!(1)]]), Backend::Graph, 20);
        assert_eq!(out.records[0].get("b"), Some(&Scalar::Null));
        assert_eq!(out.records[0].len(), 2);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let set = raw(
            &["time", "sensor", "reading", "flags"],
            vec![
                vec![json!(1_700_000_000_000_000_000i64), json!({"id": "TEMP-101"}), json!(21.5), json!([1, 2])],
                vec![json!("2024-01-01T00:00:00Z"), Value::Null, json!(3), json!(false)],
            ],
        );
        let once = normalize(&set, Backend::Series, 20);
        let twice = normalize(&RawResultSet::from(&once), Backend::Series, 20);
        assert_eq!(once.records, twice.records);
        assert_eq!(once.columns, twice.columns);
    }
}
