//! Header cell to canonical column assignment
//!
//! Each header cell is matched against the synonym table (exact, substring,
//! then fuzzy). Cells are assigned strongest-first so that a canonical
//! column goes to the most confident cell; ties go to the leftmost cell.

use crate::application::use_cases::synonym_match::{best_match, SynonymMatch};
use crate::domain::columns::{CanonicalColumn, ColumnMapping};
use crate::domain::grid::Grid;
use crate::domain::import_config::ExtractionConfig;
use crate::domain::warning::{ImportWarning, WarningCode};
use crate::shared::text::normalize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

const PENALTY_NO_ITEM: f64 = 0.5;
const PENALTY_NO_COST: f64 = 0.5;
const PENALTY_NO_MARKUP: f64 = 0.1;
const PENALTY_UNMAPPED: f64 = 0.1;
const UNMAPPED_HEADER_LIMIT: usize = 3;

#[derive(Debug, Clone)]
pub struct ColumnMapperOutput {
    pub mapping: ColumnMapping,
    /// Header texts that could not be assigned, in column order
    pub unmapped_headers: Vec<String>,
    pub warnings: Vec<ImportWarning>,
}

impl ColumnMapperOutput {
    pub fn is_fatal(&self) -> bool {
        self.warnings.iter().any(|w| w.is_fatal())
    }
}

pub struct ColumnMapper<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> ColumnMapper<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn map(&self, grid: &Grid, header_row: usize) -> ColumnMapperOutput {
        let headers: Vec<&str> = grid
            .row(header_row)
            .map(|cells| cells.iter().map(|c| c.as_str()).collect())
            .unwrap_or_default();

        let mut warnings = Vec::new();
        let mut unmapped: Vec<usize> = Vec::new();
        let mut hits: Vec<(usize, SynonymMatch)> = Vec::new();

        for (idx, header) in headers.iter().enumerate() {
            let normalized = normalize(header);
            if normalized.is_empty() {
                continue;
            }

            match best_match(&normalized) {
                Some(hit) if hit.confidence >= self.config.column_min_confidence => {
                    hits.push((idx, hit))
                }
                _ => unmapped.push(idx),
            }
        }

        // strongest first; stable sort keeps leftmost on ties
        hits.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));

        let mut mapping = ColumnMapping::default();
        let mut claimed_by: HashMap<CanonicalColumn, usize> = HashMap::new();

        for (idx, hit) in hits {
            if let Some(&owner) = claimed_by.get(&hit.column) {
                warnings.push(
                    ImportWarning::new(
                        WarningCode::ColumnAmbiguous,
                        format!(
                            "Header \"{}\" also looks like the {} column already taken by \"{}\"",
                            headers[idx], hit.column, headers[owner]
                        ),
                    )
                    .with_details(json!({
                        "column": hit.column,
                        "header": headers[idx],
                        "claimedBy": headers[owner],
                        "confidence": hit.confidence,
                    })),
                );
                unmapped.push(idx);
                continue;
            }

            claimed_by.insert(hit.column, idx);
            mapping.columns.insert(idx, hit.column);
        }

        unmapped.sort_unstable();
        let unmapped_headers: Vec<String> =
            unmapped.iter().map(|idx| headers[*idx].to_string()).collect();

        let mut confidence: f64 = 1.0;

        if !mapping.has(CanonicalColumn::Item) {
            confidence -= PENALTY_NO_ITEM;
            warnings.push(
                ImportWarning::fatal(
                    WarningCode::ColumnMissing,
                    "No item/description column found in the header row",
                )
                .at_row(header_row + 1)
                .with_details(json!({ "column": CanonicalColumn::Item })),
            );
        }

        if !mapping.has_any_cost_column() {
            confidence -= PENALTY_NO_COST;
            warnings.push(
                ImportWarning::fatal(
                    WarningCode::ColumnMissing,
                    "No labor, material or subcontract cost column found in the header row",
                )
                .at_row(header_row + 1)
                .with_details(json!({ "columns": CanonicalColumn::COST_COMPONENTS })),
            );
        }

        if !mapping.has(CanonicalColumn::Markup) {
            confidence -= PENALTY_NO_MARKUP;
            warnings.push(
                ImportWarning::new(
                    WarningCode::ColumnMissing,
                    "No markup column found; prices will be left empty",
                )
                .at_row(header_row + 1)
                .with_details(json!({ "column": CanonicalColumn::Markup })),
            );
        }

        if unmapped_headers.len() > UNMAPPED_HEADER_LIMIT {
            confidence -= PENALTY_UNMAPPED;
        }

        mapping.confidence = confidence.clamp(0.0, 1.0);

        if mapping.confidence < self.config.low_confidence_threshold {
            warnings.push(
                ImportWarning::new(
                    WarningCode::LowConfidenceMapping,
                    format!(
                        "Column mapping confidence is {:.2}; please review the detected columns",
                        mapping.confidence
                    ),
                )
                .at_row(header_row + 1)
                .with_details(json!({
                    "confidence": mapping.confidence,
                    "unmappedHeaders": unmapped_headers,
                })),
            );
        }

        debug!(
            header_row,
            mapped = mapping.columns.len(),
            unmapped = unmapped_headers.len(),
            confidence = mapping.confidence,
            "Columns mapped"
        );

        ColumnMapperOutput {
            mapping,
            unmapped_headers,
            warnings,
        }
    }
}
