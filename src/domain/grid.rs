//! Uniform 2-D array of text cells produced from a tabular source

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Rectangular grid of trimmed text cells.
///
/// Rows are padded with empty cells up to the widest row observed; blank
/// cells are never removed. Once built the grid is not mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<String>>,
    width: usize,
}

impl Grid {
    /// Build a grid from raw rows, trimming each cell and padding ragged rows
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);

        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells: Vec<String> =
                    row.into_iter().map(|c| c.trim().to_string()).collect();
                cells.resize(width, String::new());
                cells
            })
            .collect();

        Self { rows, width }
    }

    /// Convenience constructor for literal rows
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Cell text, or an empty string when out of bounds
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|c| c.as_str())
            .unwrap_or("")
    }

    /// Cell text for an optional column
    pub fn cell_opt(&self, row: usize, col: Option<usize>) -> &str {
        col.map(|c| self.cell(row, c)).unwrap_or("")
    }

    /// All cells of a row joined with single spaces, blanks skipped
    pub fn row_text(&self, index: usize) -> String {
        self.row(index)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|c| !c.is_empty())
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    /// SHA-256 of the grid contents, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.width as u64).to_le_bytes());
        for row in &self.rows {
            for cell in row {
                hasher.update(cell.as_bytes());
                hasher.update([0x1f]);
            }
            hasher.update([0x1e]);
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_to_widest_row() {
        let grid = Grid::from_rows(vec![vec!["a"], vec!["b", "c", "d"], vec![]]);

        assert_eq!(grid.width(), 3);
        assert_eq!(grid.row(0).unwrap().len(), 3);
        assert_eq!(grid.row(2).unwrap(), &["", "", ""]);
    }

    #[test]
    fn test_trims_cell_edges_only() {
        let grid = Grid::from_rows(vec![vec!["  Rough  Framing \t"]]);
        assert_eq!(grid.cell(0, 0), "Rough  Framing");
    }

    #[test]
    fn test_out_of_bounds_cell_is_blank() {
        let grid = Grid::from_rows(vec![vec!["x"]]);
        assert_eq!(grid.cell(5, 5), "");
        assert_eq!(grid.cell_opt(0, None), "");
    }

    #[test]
    fn test_fingerprint_is_stable_and_content_sensitive() {
        let a = Grid::from_rows(vec![vec!["Item", "Labor"], vec!["Demo", "100"]]);
        let b = Grid::from_rows(vec![vec!["Item", "Labor"], vec!["Demo", "100"]]);
        let c = Grid::from_rows(vec![vec!["Item", "Labor"], vec!["Demo", "101"]]);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_row_text_skips_blanks() {
        let grid = Grid::from_rows(vec![vec!["", "Total Cost", "", "$484,549.00"]]);
        assert_eq!(grid.row_text(0), "Total Cost $484,549.00");
    }
}
