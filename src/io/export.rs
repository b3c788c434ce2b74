//! Export the combined dataset to CSV.
//!
//! The file starts with a UTF-8 BOM so spreadsheet tools pick the right
//! encoding for the Chinese headers. The first column is a 1-based row number.
//! Writes go to a temporary file in the destination directory, which then
//! replaces the previous export.

use std::fs::create_dir_all;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::domain::ROW_NUMBER_HEADER;
use crate::error::AppError;
use crate::io::flatten::FlatTable;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write `table` to `path`, replacing any existing file.
pub fn write_incidents_csv(path: &Path, table: &FlatTable) -> Result<(), AppError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    create_dir_all(parent)
        .map_err(|e| AppError::io(format!("Failed to create output dir '{}': {e}", parent.display())))?;

    let temp = NamedTempFile::new_in(parent)
        .map_err(|e| AppError::io(format!("Failed to create temporary file in '{}': {e}", parent.display())))?;

    let mut buf = BufWriter::new(temp);
    buf.write_all(UTF8_BOM)
        .map_err(|e| AppError::io(format!("Failed to write CSV BOM: {e}")))?;

    let mut writer = csv::Writer::from_writer(buf);

    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push(ROW_NUMBER_HEADER);
    header.extend(table.columns.iter().map(String::as_str));
    writer
        .write_record(&header)
        .map_err(|e| AppError::io(format!("Failed to write CSV header: {e}")))?;

    for (idx, row) in table.rows.iter().enumerate() {
        let number = (idx + 1).to_string();
        writer
            .write_record(std::iter::once(number.as_str()).chain(row.iter().map(String::as_str)))
            .map_err(|e| AppError::io(format!("Failed to write CSV row {}: {e}", idx + 1)))?;
    }

    let buf = writer
        .into_inner()
        .map_err(|e| AppError::io(format!("Failed to flush CSV: {}", e.error())))?;
    let temp = buf
        .into_inner()
        .map_err(|e| AppError::io(format!("Failed to flush CSV: {}", e.error())))?;

    temp.persist(path)
        .map_err(|e| AppError::io(format!("Failed to write CSV '{}': {}", path.display(), e.error)))?;

    Ok(())
}
