//! xlsx / xlsm / xls / ods via calamine. Reads one worksheet into a Grid
//! with every cell rendered as text.

use crate::domain::error::{AppError, Result};
use crate::domain::grid::Grid;
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use tracing::debug;

/// Largest float still rendered as an integer without loss
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Default)]
pub struct SpreadsheetGridReader {
    /// Defaults to the first sheet
    sheet: Option<String>,
}

impl SpreadsheetGridReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>) -> Self {
        self.sheet = Some(name.into());
        self
    }

    pub fn parse_file(&self, path: &Path) -> Result<Grid> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            AppError::ParseError(format!(
                "Failed to open spreadsheet {}: {}",
                path.display(),
                e
            ))
        })?;

        let range = match &self.sheet {
            Some(name) => workbook
                .worksheet_range(name)
                .map_err(|e| AppError::ParseError(format!("Failed to read sheet {}: {}", name, e)))?,
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?
                .map_err(|e| AppError::ParseError(format!("Failed to read first sheet: {}", e)))?,
        };

        let grid = range_to_grid(&range);
        debug!(
            rows = grid.row_count(),
            width = grid.width(),
            sheet = self.sheet.as_deref().unwrap_or("<first>"),
            "Spreadsheet grid parsed"
        );
        Ok(grid)
    }
}

/// Rows before the used range's start are kept blank so row numbers match the sheet
fn range_to_grid(range: &Range<Data>) -> Grid {
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut cells = vec![String::new(); start_col];
        cells.extend(row.iter().map(cell_text));
        rows.push(cells);
    }
    Grid::new(rows)
}

/// Integral floats render without a trailing ".0"
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => {
            format!("{}", *f as i64)
        }
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}
