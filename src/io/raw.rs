//! Raw JSON archive, one file per fetched window.
//!
//! Files are named `disasters_{YYYYMMDD}_{YYYYMMDD}.json`; a filtered query
//! gets the filter label appended. Content is the parsed response body,
//! pretty-printed with non-ASCII text kept as-is.

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::domain::{QueryFilter, QueryWindow};
use crate::error::AppError;

/// File name for a window's raw response.
pub fn raw_file_name(window: &QueryWindow, filter: &QueryFilter) -> String {
    match filter.label() {
        Some(label) => format!(
            "disasters_{}_{}_{}.json",
            window.api_start(),
            window.api_end(),
            sanitize_label(&label)
        ),
        None => format!("disasters_{}_{}.json", window.api_start(), window.api_end()),
    }
}

/// Write `body` under `dir`, creating the directory if needed. Overwrites.
pub fn write_raw_json(
    dir: &Path,
    window: &QueryWindow,
    filter: &QueryFilter,
    body: &Value,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create raw data dir '{}': {e}", dir.display())))?;

    let path = dir.join(raw_file_name(window, filter));
    let file = File::create(&path)
        .map_err(|e| AppError::io(format!("Failed to create raw JSON '{}': {e}", path.display())))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, body)
        .map_err(|e| AppError::io(format!("Failed to write raw JSON '{}': {e}", path.display())))?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush raw JSON '{}': {e}", path.display())))?;

    Ok(path)
}

fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
