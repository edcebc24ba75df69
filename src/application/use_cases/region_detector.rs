//! Line-item table boundary detection
//!
//! The table starts right below the header. It ends before the first row
//! carrying a stop phrase, or at a run of structurally empty rows, or at
//! the end of the grid. Stop phrases are checked first on every row.

use crate::domain::columns::{CanonicalColumn, ColumnMapping};
use crate::domain::extraction::StopReason;
use crate::domain::grid::Grid;
use crate::domain::import_config::ExtractionConfig;
use crate::domain::money::{is_zero, parse_money, MoneyCell};
use crate::domain::warning::{ImportWarning, WarningCode};
use crate::shared::text::{find_phrase, normalize};
use serde_json::json;
use tracing::debug;

/// Boilerplate that only appears once the line items are over. Matched
/// anywhere in the row on word boundaries.
pub const STOP_PHRASES: &[&str] = &[
    "total cost",
    "total project cost",
    "grand total",
    "project total",
    "contract total",
    "total contract",
    "contract sum",
    "terms and conditions",
    "payment terms",
    "payment schedule",
    "authorized signature",
    "signature block",
    "accepted by",
    "approved by",
    "hours worked",
];

/// Section headings that end the table only when they stand alone: the
/// whole row reads as the word, or the first cell starts with "word:".
pub const STOP_HEADINGS: &[&str] = &[
    "exclusions",
    "clarifications",
    "signature",
    "signatures",
    "timecard",
    "timecards",
    "payroll",
    "reconciliation",
];

#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    /// First data row (header + 1), 0-based inclusive
    pub start: usize,
    /// 0-based exclusive
    pub end: usize,
    pub stop_reason: StopReason,
}

impl TableRegion {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct RegionOutput {
    pub region: TableRegion,
    pub warnings: Vec<ImportWarning>,
}

pub struct RegionDetector<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> RegionDetector<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, grid: &Grid, mapping: &ColumnMapping, header_row: usize) -> RegionOutput {
        let start = header_row + 1;
        let extra: Vec<String> = self
            .config
            .extra_stop_phrases
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty())
            .collect();

        let mut phrases: Vec<&str> = STOP_PHRASES.to_vec();
        phrases.extend(extra.iter().map(|p| p.as_str()));

        let mut empty_run = 0usize;

        for row in start..grid.row_count() {
            let text = normalize(&grid.row_text(row));

            let phrase = find_phrase(&text, phrases.iter().copied())
                .or_else(|| stop_heading(grid, row, &text));

            if let Some(phrase) = phrase {
                debug!(row, phrase, "Stop marker found");
                return RegionOutput {
                    region: TableRegion {
                        start,
                        end: row,
                        stop_reason: StopReason::StopMarker {
                            phrase: phrase.to_string(),
                        },
                    },
                    warnings: vec![ImportWarning::new(
                        WarningCode::StopMarkerFound,
                        format!("Line items end before row {}: found \"{}\"", row + 1, phrase),
                    )
                    .at_row(row + 1)
                    .with_details(json!({ "phrase": phrase }))],
                };
            }

            if self.is_structurally_empty(grid, mapping, row) {
                empty_run += 1;
            } else {
                empty_run = 0;
            }

            if empty_run >= self.config.empty_row_run {
                let end = row + 1 - empty_run;
                debug!(row, end, "Stop by empty rows");
                return RegionOutput {
                    region: TableRegion {
                        start,
                        end,
                        stop_reason: StopReason::EmptyRows { count: empty_run },
                    },
                    warnings: vec![ImportWarning::new(
                        WarningCode::StopByStructure,
                        format!(
                            "Line items end at row {}: {} consecutive empty rows",
                            end + 1,
                            empty_run
                        ),
                    )
                    .at_row(end + 1)
                    .with_details(json!({ "emptyRows": empty_run }))],
                };
            }
        }

        RegionOutput {
            region: TableRegion {
                start: start.min(grid.row_count()),
                end: grid.row_count(),
                stop_reason: StopReason::EndOfGrid,
            },
            warnings: Vec::new(),
        }
    }

    /// Blank item text and every mapped money cell blank or zero
    fn is_structurally_empty(&self, grid: &Grid, mapping: &ColumnMapping, row: usize) -> bool {
        let item = grid.cell_opt(row, mapping.index_of(CanonicalColumn::Item));
        if !item.is_empty() {
            return false;
        }

        mapping.money_indices().into_iter().all(|col| {
            match parse_money(grid.cell(row, col)) {
                MoneyCell::Blank => true,
                MoneyCell::Amount { magnitude, .. } => is_zero(magnitude),
                MoneyCell::Unparseable => false,
            }
        })
    }
}

fn stop_heading(grid: &Grid, row: usize, text: &str) -> Option<&'static str> {
    let first_cell = grid
        .row(row)
        .and_then(|cells| cells.iter().find(|c| !c.is_empty()))
        .map(|c| c.to_lowercase())
        .unwrap_or_default();

    STOP_HEADINGS.iter().copied().find(|heading| {
        text == *heading
            || first_cell
                .strip_prefix(heading)
                .map(|rest| rest.trim_start().starts_with(':'))
                .unwrap_or(false)
    })
}
