//! What the pipeline hands back to persistence and review

use super::columns::ColumnMapping;
use super::line_item::{EnrichedLineItem, ExtractedLineItem};
use super::warning::ImportWarning;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why the table region ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// A stop phrase was found on the row
    StopMarker { phrase: String },
    /// Consecutive structurally empty rows
    EmptyRows { count: usize },
    EndOfGrid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    /// 0-based grid index of the header row
    pub header_row: Option<usize>,
    /// 0-based exclusive end of the table region
    pub stop_row: Option<usize>,
    pub stop_reason: Option<StopReason>,
    pub rows_scanned: usize,
    pub rows_extracted: usize,
    pub compound_splits: usize,
    pub mapping: Option<ColumnMapping>,
    pub mapping_confidence: f64,
    pub total_cost: f64,
    pub total_price: f64,
    pub source_fingerprint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub items: Vec<ExtractedLineItem>,
    pub warnings: Vec<ImportWarning>,
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    /// Aborted extraction: no items, diagnostics kept
    pub fn failed(warnings: Vec<ImportWarning>, metadata: ExtractionMetadata) -> Self {
        Self {
            success: false,
            items: Vec::new(),
            warnings,
            metadata,
        }
    }
}

/// Which classification path produced the categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Deterministic,
    Assisted,
    /// Some assistant batches were discarded
    PartialFallback,
    /// Every assistant batch was discarded
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub import_id: Uuid,
    pub success: bool,
    pub items: Vec<EnrichedLineItem>,
    pub warnings: Vec<ImportWarning>,
    pub metadata: ExtractionMetadata,
    pub classification: ClassificationSource,
}
