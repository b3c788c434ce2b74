//! Flatten heterogeneous incident objects into a rectangular table.
//!
//! Rules:
//! - columns are the union of keys across all records, in first-seen order
//! - nested objects become `parent.child` columns
//! - arrays are kept as compact JSON text in a single cell
//! - `null` and missing keys become empty cells
//! - a name repeated within one record (dotted key vs nested path) gets a
//!   `#n` suffix on later occurrences
//! - strings are written verbatim; numbers and booleans use their JSON text

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::domain::{API_DATE_FORMAT, FIELD_DATE, IncidentRecord};

/// A flattened dataset: every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FlatTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx)).map(String::as_str)
    }
}

/// Flatten `records` into a table, preserving record order.
pub fn flatten_records(records: &[IncidentRecord]) -> FlatTable {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut flat_rows: Vec<Vec<(usize, String)>> = Vec::with_capacity(records.len());

    for record in records {
        let mut cells = Vec::new();
        flatten_object(record, None, &mut cells);

        let mut row = Vec::with_capacity(cells.len());
        let mut seen_in_row: HashMap<String, usize> = HashMap::new();
        for (key, value) in cells {
            let key = disambiguate(key, &mut seen_in_row);
            let col = match index.get(&key) {
                Some(&col) => col,
                None => {
                    let col = columns.len();
                    columns.push(key.clone());
                    index.insert(key, col);
                    col
                }
            };
            row.push((col, value));
        }
        flat_rows.push(row);
    }

    let width = columns.len();
    let rows = flat_rows
        .into_iter()
        .map(|cells| {
            let mut row = vec![String::new(); width];
            for (col, value) in cells {
                row[col] = value;
            }
            row
        })
        .collect();

    FlatTable { columns, rows }
}

/// A dotted top-level key and a nested path can flatten to the same name.
/// The n-th occurrence within one row becomes `name#n` so no value is lost.
fn disambiguate(key: String, seen: &mut HashMap<String, usize>) -> String {
    let count = seen.entry(key.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        key
    } else {
        format!("{key}#{count}")
    }
}

fn flatten_object(map: &IncidentRecord, prefix: Option<&str>, out: &mut Vec<(String, String)>) {
    for (key, value) in map {
        let name = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            // An empty object still gets its column so the field is not lost.
            Value::Object(inner) if !inner.is_empty() => flatten_object(inner, Some(&name), out),
            other => out.push((name, cell_text(other))),
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Rewrite the incident date from `YYYYMMDD` to `YYYY-MM-DD`.
///
/// Values that do not parse are left untouched.
pub fn normalize_record(record: &IncidentRecord) -> IncidentRecord {
    let mut out = record.clone();
    if let Some(Value::String(raw)) = out.get_mut(FIELD_DATE) {
        if let Some(iso) = normalize_date(raw) {
            *raw = iso;
        }
    }
    out
}

fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, API_DATE_FORMAT)
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}
