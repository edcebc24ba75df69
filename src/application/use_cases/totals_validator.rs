//! Aggregate cost vs. price sanity check

use crate::domain::import_config::ExtractionConfig;
use crate::domain::line_item::ExtractedLineItem;
use crate::domain::money::round2;
use crate::domain::warning::{ImportWarning, WarningCode};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
pub struct TotalsCheck {
    pub total_cost: f64,
    /// Sum over items that carry a price
    pub total_price: f64,
    pub warnings: Vec<ImportWarning>,
}

/// Sum cost and price; flag sheets whose price falls well below cost.
/// Never blocks extraction.
pub fn validate_totals(items: &[ExtractedLineItem], config: &ExtractionConfig) -> TotalsCheck {
    let total_cost = round2(items.iter().map(|i| i.cost).sum());
    let total_price = round2(items.iter().filter_map(|i| i.price).sum());

    let mut warnings = Vec::new();
    if total_price > 0.0 && total_price < total_cost * config.total_mismatch_ratio {
        warnings.push(
            ImportWarning::new(
                WarningCode::TotalMismatch,
                format!(
                    "Total price {:.2} is less than {:.0}% of total cost {:.2}",
                    total_price,
                    config.total_mismatch_ratio * 100.0,
                    total_cost
                ),
            )
            .with_details(json!({
                "totalCost": total_cost,
                "totalPrice": total_price,
            })),
        );
    }

    TotalsCheck {
        total_cost,
        total_price,
        warnings,
    }
}
