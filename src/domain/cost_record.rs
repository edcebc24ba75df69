//! Shape handed to persistence once the reviewer accepts items

use super::import_config::ExtractionConfig;
use super::line_item::{Category, EnrichedLineItem};
use super::money::round2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLineRecord {
    pub description: String,
    pub category: Category,
    pub vendor: Option<String>,
    pub quantity: f64,
    /// `hr` or `ls`
    pub unit: String,
    pub cost_per_unit: f64,
    pub price_per_unit: Option<f64>,
    /// Markup as a percentage, e.g. 20.0
    pub markup_percent: Option<f64>,
    /// Carried verbatim from the line item
    pub total_cost: f64,
    pub total_price: Option<f64>,
    pub source_row: usize,
    pub notes: Option<String>,
}

pub const UNIT_HOURS: &str = "hr";
pub const UNIT_LUMP_SUM: &str = "ls";

/// Convert an accepted line item into its persisted shape. No I/O.
///
/// Internal labor is expressed as hours at the configured rate; everything
/// else is a lump sum of quantity 1.
pub fn to_cost_record(item: &EnrichedLineItem, config: &ExtractionConfig) -> CostLineRecord {
    let line = &item.item;
    let markup = line.markup;

    let hourly = match (item.category, config.internal_labor_hourly_rate) {
        (Category::InternalLabor, Some(rate)) if rate > 0.0 => Some(rate),
        _ => None,
    };

    let (quantity, unit, cost_per_unit) = match hourly {
        Some(rate) => (round2(line.cost / rate), UNIT_HOURS, round2(rate)),
        None => (1.0, UNIT_LUMP_SUM, line.cost),
    };

    let price_per_unit = markup.map(|m| round2(cost_per_unit * (1.0 + m)));

    let notes = line.split_from_name.as_ref().map(|original| {
        format!("Split from \"{}\" (row {})", original, line.source_row)
    });

    CostLineRecord {
        description: item.normalized_name.clone(),
        category: item.category,
        vendor: line.vendor.clone(),
        quantity,
        unit: unit.to_string(),
        cost_per_unit,
        price_per_unit,
        markup_percent: markup.map(|m| round2(m * 100.0)),
        total_cost: line.cost,
        total_price: line.price,
        source_row: line.source_row,
        notes,
    }
}

/// Convert the caller-selected subset. `selected` holds 0-based indices
/// into `items`, so either half of a split row can be picked on its own;
/// out-of-range indices are ignored. None selects everything.
pub fn to_cost_records(
    items: &[EnrichedLineItem],
    selected: Option<&[usize]>,
    config: &ExtractionConfig,
) -> Vec<CostLineRecord> {
    items
        .iter()
        .enumerate()
        .filter(|(index, _)| selected.map_or(true, |indices| indices.contains(index)))
        .map(|(_, item)| to_cost_record(item, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::line_item::{CostComponent, ExtractedLineItem};

    fn enriched(
        name: &str,
        component: CostComponent,
        category: Category,
        cost: f64,
        markup: Option<f64>,
        split_from: Option<&str>,
    ) -> EnrichedLineItem {
        let item = ExtractedLineItem {
            source_row: 7,
            source_item_text: split_from.unwrap_or(name).to_string(),
            name: name.to_string(),
            component,
            vendor: Some("RCG".to_string()),
            cost,
            markup,
            price: markup.map(|m| round2(cost * (1.0 + m))),
            was_split: split_from.is_some(),
            split_from_name: split_from.map(String::from),
        };
        EnrichedLineItem::new(&item, category, name.to_string(), 1.0)
    }

    #[test]
    fn test_lump_sum_record() {
        let item = enriched(
            "Framing - Materials",
            CostComponent::Material,
            Category::Materials,
            10000.0,
            Some(0.2),
            Some("Framing"),
        );
        let record = to_cost_record(&item, &ExtractionConfig::default());

        assert_eq!(record.quantity, 1.0);
        assert_eq!(record.unit, "ls");
        assert_eq!(record.cost_per_unit, 10000.0);
        assert_eq!(record.price_per_unit, Some(12000.0));
        assert_eq!(record.markup_percent, Some(20.0));
        assert_eq!(record.total_price, Some(12000.0));
        assert_eq!(record.notes.as_deref(), Some("Split from \"Framing\" (row 7)"));
    }

    #[test]
    fn test_internal_labor_as_hours() {
        let config = ExtractionConfig {
            internal_labor_hourly_rate: Some(80.0),
            ..Default::default()
        };
        let item = enriched(
            "Demo",
            CostComponent::Labor,
            Category::InternalLabor,
            2000.0,
            None,
            None,
        );
        let record = to_cost_record(&item, &config);

        assert_eq!(record.unit, "hr");
        assert_eq!(record.quantity, 25.0);
        assert_eq!(record.cost_per_unit, 80.0);
        assert_eq!(record.price_per_unit, None);
        assert_eq!(record.total_cost, 2000.0);
        assert!(record.notes.is_none());
    }

    #[test]
    fn test_selection_filters_by_item_index() {
        let items = vec![enriched(
            "Demo",
            CostComponent::Labor,
            Category::InternalLabor,
            100.0,
            Some(0.1),
            None,
        )];
        let config = ExtractionConfig::default();

        assert_eq!(to_cost_records(&items, Some(&[0]), &config).len(), 1);
        assert!(to_cost_records(&items, Some(&[3]), &config).is_empty());
        assert!(to_cost_records(&items, Some(&[] as &[usize]), &config).is_empty());
        assert_eq!(to_cost_records(&items, None, &config).len(), 1);
    }

    #[test]
    fn test_one_half_of_a_split_row_can_be_selected() {
        let items = vec![
            enriched(
                "Framing - Materials",
                CostComponent::Material,
                Category::Materials,
                10000.0,
                Some(0.2),
                Some("Framing"),
            ),
            enriched(
                "Framing - Subcontractor",
                CostComponent::Subcontract,
                Category::Subcontractors,
                5000.0,
                Some(0.2),
                Some("Framing"),
            ),
        ];
        let config = ExtractionConfig::default();

        let records = to_cost_records(&items, Some(&[1]), &config);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Framing - Subcontractor");
        assert_eq!(records[0].total_cost, 5000.0);
        assert_eq!(records[0].source_row, 7);
    }
}
