pub mod csv_reader;
pub mod spreadsheet_reader;

use crate::domain::error::{AppError, Result};
use crate::domain::grid::Grid;
use csv_reader::CsvGridReader;
use spreadsheet_reader::SpreadsheetGridReader;
use std::path::Path;

/// Read a budget export into a raw grid, choosing the reader by extension
pub fn read_grid(path: &Path) -> Result<Grid> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" | "tsv" | "txt" => CsvGridReader::new().parse_file(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => SpreadsheetGridReader::new().parse_file(path),
        other => Err(AppError::ValidationError(format!(
            "Unsupported budget file type: {}",
            if other.is_empty() { "<none>" } else { other }
        ))),
    }
}
