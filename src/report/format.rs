//! Formatted terminal output.
//!
//! Kept apart from the pipeline so output changes stay local and the
//! summary can be asserted on in tests.

use crate::app::pipeline::RunOutput;
use crate::report::{UNKNOWN_YEAR, year_counts};

const RULE: &str = "============================================================";

/// Format the run summary printed after a successful collection.
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str(RULE);
    out.push('\n');
    out.push_str("重大職業災害公開網資料下載\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("API: {}\n", run.source));
    out.push_str(&format!("Range: {} ~ {}\n", run.start, run.end));
    out.push_str(&format!(
        "Windows: {} planned, {} fetched\n",
        run.planned_windows,
        run.results.len()
    ));

    out.push_str("\nPer window:\n");
    for result in &run.results {
        let mut line = format!("  {}", result.window);
        if let Some(label) = result.filter.label() {
            line.push_str(&format!(" [{label}]"));
        }
        line.push_str(&format!(": {}", result.len()));
        if result.from_split {
            line.push_str(" (split)");
        }
        if result.at_cap {
            line.push_str(" (AT CAP, may be truncated)");
        }
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str(&format!("\nTotal records: {}\n", run.total_records()));

    let years = year_counts(&run.records);
    let mut known = years.keys().filter(|y| y.as_str() != UNKNOWN_YEAR);
    if let Some(first) = known.next() {
        let last = known.next_back().unwrap_or(first);
        out.push_str(&format!("資料期間: {first} ~ {last}\n"));
    }
    if !years.is_empty() {
        out.push_str("\nPer year:\n");
        for (year, count) in &years {
            out.push_str(&format!("  {year}: {count}\n"));
        }
    }

    match &run.csv_path {
        Some(path) => out.push_str(&format!(
            "\nCSV: {} ({} rows, {} columns)\n",
            path.display(),
            run.table.len(),
            run.table.columns.len()
        )),
        None => out.push_str("\nCSV: not written (no records fetched); previous export kept\n"),
    }
    out.push_str(&format!("Raw JSON: {}\n", run.raw_dir.display()));

    let capped = run.capped().count();
    if capped > 0 {
        out.push_str(&format!(
            "\nWarning: {capped} window(s) hit the page cap and may be incomplete.\n"
        ));
    }

    out
}
