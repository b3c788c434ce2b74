//! Reporting utilities: per-year counts and the terminal run summary.

use std::collections::BTreeMap;

use crate::domain::{IncidentRecord, record_year};

pub mod format;

pub use format::*;

/// Label used for records with neither a year nor a parseable incident date.
pub const UNKNOWN_YEAR: &str = "unknown";

/// Record counts keyed by reporting year, ascending.
pub fn year_counts(records: &[IncidentRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        let year = record_year(record).unwrap_or_else(|| UNKNOWN_YEAR.to_string());
        *counts.entry(year).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_by_year_with_fallbacks() {
        let records: Vec<IncidentRecord> = [
            json!({"年度": "107"}),
            json!({"年度": "107"}),
            json!({"年度": 108}),
            json!({"發生日期": "20240301"}),
            json!({"其他": "x"}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect();

        let counts = year_counts(&records);
        assert_eq!(counts.get("107"), Some(&2));
        assert_eq!(counts.get("108"), Some(&1));
        assert_eq!(counts.get("2024"), Some(&1));
        assert_eq!(counts.get(UNKNOWN_YEAR), Some(&1));
    }
}
