//! Row to line-item extraction, including compound-row splitting
//!
//! A row whose cost is spread over more than one of labor, material and
//! subcontract becomes one item per non-zero component. The produced
//! costs always add up to the rounded row total.

use crate::application::use_cases::region_detector::TableRegion;
use crate::domain::columns::{CanonicalColumn, ColumnMapping};
use crate::domain::grid::Grid;
use crate::domain::import_config::ExtractionConfig;
use crate::domain::line_item::{CostComponent, ExtractedLineItem};
use crate::domain::money::{is_zero, parse_money, parse_percent, round2, MoneyCell, PercentCell};
use crate::domain::warning::{ImportWarning, WarningCode};
use crate::shared::text::normalize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tracing::debug;

/// Suffix for the material part of a split row
pub const MATERIALS_SUFFIX: &str = " - Materials";

/// Subtotal and grand-total lines may carry a label; a bare "Total" or
/// "Summary" must stand alone so items like "Total Station Rental" survive.
static SUMMARY_ROW_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(grand totals?|sub ?totals?)( |$)|^(totals?|summary)( \d+)*$").unwrap()
});

#[derive(Debug, Clone, Default)]
pub struct ExtractorOutput {
    pub items: Vec<ExtractedLineItem>,
    pub warnings: Vec<ImportWarning>,
    /// Rows that produced at least one item
    pub rows_extracted: usize,
    pub compound_splits: usize,
}

/// Columns resolved once per extraction
struct RowColumns {
    item: Option<usize>,
    vendor: Option<usize>,
    labor: Option<usize>,
    material: Option<usize>,
    sub: Option<usize>,
    markup: Option<usize>,
}

impl RowColumns {
    fn from_mapping(mapping: &ColumnMapping) -> Self {
        Self {
            item: mapping.index_of(CanonicalColumn::Item),
            vendor: mapping.index_of(CanonicalColumn::Vendor),
            labor: mapping.index_of(CanonicalColumn::Labor),
            material: mapping.index_of(CanonicalColumn::Material),
            sub: mapping.index_of(CanonicalColumn::Sub),
            markup: mapping.index_of(CanonicalColumn::Markup),
        }
    }
}

pub struct LineItemExtractor<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> LineItemExtractor<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, grid: &Grid, mapping: &ColumnMapping, region: &TableRegion) -> ExtractorOutput {
        let columns = RowColumns::from_mapping(mapping);
        let mut out = ExtractorOutput::default();

        if columns.markup.is_none() && !region.is_empty() {
            out.warnings.push(ImportWarning::new(
                WarningCode::MarkupMissing,
                "Sheet has no markup column; prices are left empty for every item",
            ));
        }

        for row in region.start..region.end {
            self.extract_row(grid, &columns, row, &mut out);
        }

        debug!(
            rows = region.len(),
            items = out.items.len(),
            splits = out.compound_splits,
            "Line items extracted"
        );

        out
    }

    fn extract_row(&self, grid: &Grid, columns: &RowColumns, row: usize, out: &mut ExtractorOutput) {
        let display_row = row + 1;
        let item_text = grid.cell_opt(row, columns.item);

        if item_text.is_empty() {
            out.warnings.push(
                ImportWarning::new(WarningCode::SkippedEmptyRow, "Row has no item text")
                    .at_row(display_row),
            );
            return;
        }

        if SUMMARY_ROW_PATTERN.is_match(&normalize(item_text)) {
            out.warnings.push(
                ImportWarning::new(
                    WarningCode::SkippedSummaryRow,
                    format!("Skipped summary row \"{}\"", item_text),
                )
                .at_row(display_row),
            );
            return;
        }

        let mut components: Vec<(CostComponent, f64)> = Vec::with_capacity(3);
        for (component, col, column) in [
            (CostComponent::Labor, columns.labor, CanonicalColumn::Labor),
            (CostComponent::Material, columns.material, CanonicalColumn::Material),
            (CostComponent::Subcontract, columns.sub, CanonicalColumn::Sub),
        ] {
            let Some(col) = col else { continue };
            let raw = grid.cell(row, col);
            let amount = self.read_money(raw, column, display_row, &mut out.warnings);
            if !is_zero(amount) {
                components.push((component, amount));
            }
        }

        if components.is_empty() {
            out.warnings.push(
                ImportWarning::new(
                    WarningCode::SkippedEmptyRow,
                    format!("Skipped \"{}\": no labor, material or subcontract cost", item_text),
                )
                .at_row(display_row),
            );
            return;
        }

        let markup = columns
            .markup
            .and_then(|col| self.read_markup(grid.cell(row, col), display_row, &mut out.warnings));

        let was_split = components.len() > 1;
        let vendor_cell = grid.cell_opt(row, columns.vendor);
        let costs = partition_costs(&components);

        for ((component, _), cost) in components.iter().zip(costs) {
            let name = match component {
                CostComponent::Material if was_split => format!("{}{}", item_text, MATERIALS_SUFFIX),
                _ => item_text.to_string(),
            };

            out.items.push(ExtractedLineItem {
                source_row: display_row,
                source_item_text: item_text.to_string(),
                name,
                component: *component,
                vendor: self.assign_vendor(*component, vendor_cell),
                cost,
                markup,
                price: markup.map(|m| round2(cost * (1.0 + m))),
                was_split,
                split_from_name: was_split.then(|| item_text.to_string()),
            });
        }

        out.rows_extracted += 1;
        if was_split {
            out.compound_splits += 1;
        }
    }

    /// Subcontract keeps the vendor cell; labor and material default to the
    /// internal vendor unless the cell names someone else.
    fn assign_vendor(&self, component: CostComponent, vendor_cell: &str) -> Option<String> {
        match component {
            CostComponent::Subcontract => {
                (!vendor_cell.is_empty()).then(|| vendor_cell.to_string())
            }
            CostComponent::Labor | CostComponent::Material => {
                if !vendor_cell.is_empty() && !self.config.is_internal_vendor(vendor_cell) {
                    Some(vendor_cell.to_string())
                } else {
                    Some(self.config.internal_vendor.clone())
                }
            }
        }
    }

    fn read_money(
        &self,
        raw: &str,
        column: CanonicalColumn,
        row: usize,
        warnings: &mut Vec<ImportWarning>,
    ) -> f64 {
        match parse_money(raw) {
            MoneyCell::Blank => 0.0,
            MoneyCell::Amount { magnitude, negative } => {
                if negative {
                    warnings.push(
                        ImportWarning::new(
                            WarningCode::NegativeValue,
                            format!(
                                "Negative {} amount \"{}\" was imported as {:.2}",
                                column, raw, magnitude
                            ),
                        )
                        .at_row(row)
                        .with_details(json!({ "column": column, "raw": raw, "used": magnitude })),
                    );
                }
                magnitude
            }
            MoneyCell::Unparseable => {
                warnings.push(
                    ImportWarning::new(
                        WarningCode::UnparseableCurrency,
                        format!("Could not read {} amount \"{}\"; counted as 0", column, raw),
                    )
                    .at_row(row)
                    .with_details(json!({ "column": column, "raw": raw })),
                );
                0.0
            }
        }
    }

    fn read_markup(&self, raw: &str, row: usize, warnings: &mut Vec<ImportWarning>) -> Option<f64> {
        match parse_percent(raw) {
            PercentCell::Blank => {
                warnings.push(
                    ImportWarning::new(WarningCode::MarkupMissing, "No markup on this row; price left empty")
                        .at_row(row),
                );
                None
            }
            PercentCell::Fraction { value, negative } => {
                if negative {
                    warnings.push(
                        ImportWarning::new(
                            WarningCode::NegativeValue,
                            format!("Negative markup \"{}\" was imported as {}", raw, value),
                        )
                        .at_row(row)
                        .with_details(json!({ "column": CanonicalColumn::Markup, "raw": raw, "used": value })),
                    );
                }
                Some(value)
            }
            PercentCell::Unparseable => {
                warnings.push(
                    ImportWarning::new(
                        WarningCode::UnparseablePercent,
                        format!("Could not read markup \"{}\"; price left empty", raw),
                    )
                    .at_row(row)
                    .with_details(json!({ "column": CanonicalColumn::Markup, "raw": raw })),
                );
                None
            }
        }
    }
}

/// Round each component to cents, giving the last one whatever keeps the
/// parts summing exactly to the rounded row total.
fn partition_costs(components: &[(CostComponent, f64)]) -> Vec<f64> {
    let total = round2(components.iter().map(|(_, amount)| amount).sum::<f64>());
    let mut costs = Vec::with_capacity(components.len());
    let mut allocated = 0.0;

    for (idx, (_, amount)) in components.iter().enumerate() {
        let cost = if idx + 1 == components.len() {
            round2(total - allocated).max(0.0)
        } else {
            round2(*amount)
        };
        allocated += cost;
        costs.push(cost);
    }

    costs
}
