//! Coded diagnostics returned by every extraction stage

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    HeaderNotFound,
    ColumnMissing,
    ColumnAmbiguous,
    LowConfidenceMapping,
    StopMarkerFound,
    StopByStructure,
    SkippedSummaryRow,
    SkippedEmptyRow,
    MarkupMissing,
    TotalMismatch,
    UnparseableCurrency,
    UnparseablePercent,
    NegativeValue,
}

impl WarningCode {
    /// Default severity; COLUMN_MISSING is escalated by the mapper when required
    pub fn default_severity(&self) -> Severity {
        match self {
            WarningCode::HeaderNotFound => Severity::Fatal,
            WarningCode::StopMarkerFound
            | WarningCode::StopByStructure
            | WarningCode::SkippedSummaryRow
            | WarningCode::SkippedEmptyRow => Severity::Info,
            _ => Severity::Warning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::HeaderNotFound => "HEADER_NOT_FOUND",
            WarningCode::ColumnMissing => "COLUMN_MISSING",
            WarningCode::ColumnAmbiguous => "COLUMN_AMBIGUOUS",
            WarningCode::LowConfidenceMapping => "LOW_CONFIDENCE_MAPPING",
            WarningCode::StopMarkerFound => "STOP_MARKER_FOUND",
            WarningCode::StopByStructure => "STOP_BY_STRUCTURE",
            WarningCode::SkippedSummaryRow => "SKIPPED_SUMMARY_ROW",
            WarningCode::SkippedEmptyRow => "SKIPPED_EMPTY_ROW",
            WarningCode::MarkupMissing => "MARKUP_MISSING",
            WarningCode::TotalMismatch => "TOTAL_MISMATCH",
            WarningCode::UnparseableCurrency => "UNPARSEABLE_CURRENCY",
            WarningCode::UnparseablePercent => "UNPARSEABLE_PERCENT",
            WarningCode::NegativeValue => "NEGATIVE_VALUE",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Fatal,
}

/// A diagnostic. Always returned, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportWarning {
    pub code: WarningCode,
    pub severity: Severity,
    pub message: String,
    /// 1-indexed source row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ImportWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.default_severity(),
            message: message.into(),
            row: None,
            details: None,
        }
    }

    /// Same as `new` but always fatal
    pub fn fatal(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            ..Self::new(code, message)
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}
