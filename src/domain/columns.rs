use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalColumn {
    Item,
    Vendor,
    Labor,
    Material,
    Sub,
    Markup,
    Total,
    TotalWithMarkup,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 8] = [
        CanonicalColumn::Item,
        CanonicalColumn::Vendor,
        CanonicalColumn::Labor,
        CanonicalColumn::Material,
        CanonicalColumn::Sub,
        CanonicalColumn::Markup,
        CanonicalColumn::Total,
        CanonicalColumn::TotalWithMarkup,
    ];

    /// Columns carrying a cost component
    pub const COST_COMPONENTS: [CanonicalColumn; 3] = [
        CanonicalColumn::Labor,
        CanonicalColumn::Material,
        CanonicalColumn::Sub,
    ];

    /// Known header spellings, already normalized
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            CanonicalColumn::Item => &[
                "item",
                "items",
                "description",
                "item description",
                "line item",
                "scope",
                "scope of work",
                "task",
                "trade",
                "work item",
            ],
            CanonicalColumn::Vendor => &[
                "vendor",
                "vendor name",
                "supplier",
                "contractor",
                "subcontractor name",
                "company",
                "payee",
            ],
            CanonicalColumn::Labor => &[
                "labor",
                "labour",
                "labor cost",
                "labour cost",
                "internal labor",
                "labor total",
            ],
            CanonicalColumn::Material => &[
                "material",
                "materials",
                "material cost",
                "materials cost",
                "supplies",
            ],
            CanonicalColumn::Sub => &[
                "sub",
                "subs",
                "subcontract",
                "subcontractor",
                "subcontractors",
                "sub cost",
                "subcontractor cost",
            ],
            CanonicalColumn::Markup => &[
                "markup",
                "mark up",
                "markup percent",
                "markup pct",
                "margin",
                "fee",
                "overhead and profit",
            ],
            CanonicalColumn::Total => &["total", "total cost", "cost", "amount", "line total"],
            CanonicalColumn::TotalWithMarkup => &[
                "total with markup",
                "total w markup",
                "total w mark up",
                "price",
                "total price",
                "sell price",
                "contract price",
            ],
        }
    }

    /// Weight of a synonym hit when scoring header rows
    pub fn header_weight(&self) -> f64 {
        match self {
            CanonicalColumn::Item => 3.0,
            CanonicalColumn::Vendor => 1.0,
            _ => 2.0,
        }
    }

    pub fn is_cost_component(&self) -> bool {
        Self::COST_COMPONENTS.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalColumn::Item => "item",
            CanonicalColumn::Vendor => "vendor",
            CanonicalColumn::Labor => "labor",
            CanonicalColumn::Material => "material",
            CanonicalColumn::Sub => "sub",
            CanonicalColumn::Markup => "markup",
            CanonicalColumn::Total => "total",
            CanonicalColumn::TotalWithMarkup => "total_with_markup",
        }
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partial map from grid column index to canonical role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// grid column index -> canonical column
    pub columns: BTreeMap<usize, CanonicalColumn>,
    /// Overall confidence in [0, 1]
    pub confidence: f64,
}

impl ColumnMapping {
    /// Grid index assigned to a canonical column, if any
    pub fn index_of(&self, column: CanonicalColumn) -> Option<usize> {
        self.columns
            .iter()
            .find(|(_, c)| **c == column)
            .map(|(idx, _)| *idx)
    }

    pub fn has(&self, column: CanonicalColumn) -> bool {
        self.index_of(column).is_some()
    }

    pub fn has_any_cost_column(&self) -> bool {
        CanonicalColumn::COST_COMPONENTS.iter().any(|c| self.has(*c))
    }

    /// Indices of every column holding a dollar amount
    pub fn money_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|(_, c)| {
                c.is_cost_component()
                    || matches!(c, CanonicalColumn::Total | CanonicalColumn::TotalWithMarkup)
            })
            .map(|(idx, _)| *idx)
            .collect()
    }
}
