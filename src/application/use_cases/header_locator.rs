//! Header row detection
//!
//! Scores the first rows of a grid against the column synonym table and
//! picks the row that most looks like a header. Rows full of currency
//! amounts are penalized since those are data rows.

use crate::application::use_cases::synonym_match::{best_match, MatchKind};
use crate::domain::columns::CanonicalColumn;
use crate::domain::grid::Grid;
use crate::domain::import_config::ExtractionConfig;
use crate::domain::money::is_currency_shaped;
use crate::domain::warning::{ImportWarning, WarningCode};
use crate::shared::text::normalize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

/// Weight multiplier for fuzzy (misspelled) hits
const FUZZY_WEIGHT: f64 = 0.5;
/// Score removed from rows that look like data
const CURRENCY_PENALTY: f64 = 5.0;
/// Longer cells are titles or notes, not headers
const MAX_HEADER_CELL_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCandidate {
    /// 0-based grid row
    pub row: usize,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct HeaderSearch {
    pub header: Option<HeaderCandidate>,
    pub warnings: Vec<ImportWarning>,
}

pub struct HeaderLocator<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> HeaderLocator<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    /// Find the best-scoring header row among the first `header_scan_limit` rows.
    /// On a tie the earliest row wins.
    pub fn locate(&self, grid: &Grid) -> HeaderSearch {
        let limit = self.config.header_scan_limit.min(grid.row_count());
        let mut best: Option<HeaderCandidate> = None;

        for row in 0..limit {
            let score = self.score_row(grid, row);
            if score < self.config.header_min_score {
                continue;
            }

            if best.as_ref().map(|b| score > b.score).unwrap_or(true) {
                best = Some(HeaderCandidate { row, score });
            }
        }

        match best {
            Some(header) => {
                debug!(row = header.row, score = header.score, "Header row located");
                HeaderSearch {
                    header: Some(header),
                    warnings: Vec::new(),
                }
            }
            None => HeaderSearch {
                header: None,
                warnings: vec![ImportWarning::new(
                    WarningCode::HeaderNotFound,
                    format!(
                        "No header row found in the first {} rows; expected columns such as Item, Labor, Material, Sub",
                        limit
                    ),
                )
                .with_details(json!({ "rowsScanned": limit }))],
            },
        }
    }

    /// Score one row. Each canonical column counts once, at its best weight.
    pub fn score_row(&self, grid: &Grid, row: usize) -> f64 {
        let Some(cells) = grid.row(row) else {
            return 0.0;
        };

        let mut per_column: HashMap<CanonicalColumn, f64> = HashMap::new();
        let mut currency_cells = 0usize;

        for cell in cells {
            if is_currency_shaped(cell) {
                currency_cells += 1;
                continue;
            }
            if cell.chars().count() > MAX_HEADER_CELL_LEN {
                continue;
            }

            let normalized = normalize(cell);
            let Some(hit) = best_match(&normalized) else {
                continue;
            };
            if hit.confidence < self.config.column_min_confidence {
                continue;
            }

            let weight = match hit.kind {
                MatchKind::Exact | MatchKind::Substring => hit.column.header_weight(),
                MatchKind::Fuzzy => hit.column.header_weight() * FUZZY_WEIGHT,
            };

            let entry = per_column.entry(hit.column).or_insert(0.0);
            if weight > *entry {
                *entry = weight;
            }
        }

        let mut score: f64 = per_column.values().sum();
        if currency_cells > self.config.currency_cell_limit {
            score -= CURRENCY_PENALTY;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate(rows: Vec<Vec<&str>>) -> HeaderSearch {
        let config = ExtractionConfig::default();
        HeaderLocator::new(&config).locate(&Grid::from_rows(rows))
    }

    #[test]
    fn test_finds_header_below_title_rows() {
        let search = locate(vec![
            vec!["Smith Residence", "", "", "", ""],
            vec!["Budget v3", "", "", "", ""],
            vec!["", "", "", "", ""],
            vec!["Item", "Labor", "Matreial", "Sub", "Mark Up"],
            vec!["Framing", "", "$10,000.00", "$5,000.00", "20%"],
        ]);

        assert_eq!(search.header.unwrap().row, 3);
        assert!(search.warnings.is_empty());
    }

    #[test]
    fn test_no_header_is_fatal_warning() {
        let search = locate(vec![
            vec!["Notes", "from", "site", "walk"],
            vec!["1", "2", "3", "4"],
        ]);

        assert!(search.header.is_none());
        assert_eq!(search.warnings.len(), 1);
        assert_eq!(search.warnings[0].code, WarningCode::HeaderNotFound);
        assert!(search.warnings[0].is_fatal());
    }

    #[test]
    fn test_tie_prefers_first_row() {
        let search = locate(vec![
            vec!["Item", "Labor", "Material"],
            vec!["Item", "Labor", "Material"],
        ]);
        assert_eq!(search.header.unwrap().row, 0);
    }

    #[test]
    fn test_scan_limit_is_respected() {
        let mut rows: Vec<Vec<&str>> = (0..70).map(|_| vec!["", "", ""]).collect();
        rows.push(vec!["Item", "Labor", "Material"]);

        let search = locate(rows);
        assert!(search.header.is_none());
    }

    #[test]
    fn test_currency_heavy_row_is_penalized() {
        let config = ExtractionConfig::default();
        let grid = Grid::from_rows(vec![
            vec!["Item", "Labor", "$1.00", "$2.00", "$3.00", "$4.00"],
            vec!["Item", "Labor", "", "", "", ""],
        ]);
        let locator = HeaderLocator::new(&config);

        assert!(locator.score_row(&grid, 0) < locator.score_row(&grid, 1));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let rows = vec![
            vec!["Description", "Vendor", "Labor", "Materials", "Subcontractor", "Markup"],
            vec!["Demo", "RCG", "$500", "", "", "10%"],
        ];
        let first = locate(rows.clone()).header.unwrap();
        let second = locate(rows).header.unwrap();
        assert_eq!(first, second);
    }
}
