use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which bucket of cost a line item carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostComponent {
    Labor,
    Material,
    Subcontract,
}

impl CostComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostComponent::Labor => "labor",
            CostComponent::Material => "material",
            CostComponent::Subcontract => "subcontract",
        }
    }
}

impl fmt::Display for CostComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Business category assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    InternalLabor,
    Materials,
    Subcontractors,
    Management,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::InternalLabor => "internal_labor",
            Category::Materials => "materials",
            Category::Subcontractors => "subcontractors",
            Category::Management => "management",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts snake_case, kebab-case or spaced spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match key.as_str() {
            "internal_labor" | "labor" => Ok(Category::InternalLabor),
            "materials" | "material" => Ok(Category::Materials),
            "subcontractors" | "subcontractor" | "sub" | "subs" => Ok(Category::Subcontractors),
            "management" => Ok(Category::Management),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// One cost line recovered from a source row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLineItem {
    /// 1-indexed source row, for display
    pub source_row: usize,
    /// Item cell text as found in the sheet
    pub source_item_text: String,
    pub name: String,
    pub component: CostComponent,
    pub vendor: Option<String>,
    /// Non-negative, rounded to cents
    pub cost: f64,
    /// Fraction; percentages already divided by 100
    pub markup: Option<f64>,
    /// cost * (1 + markup), rounded; None without markup
    pub price: Option<f64>,
    pub was_split: bool,
    pub split_from_name: Option<String>,
}

/// Extracted item plus classification. Never alters the extracted fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedLineItem {
    #[serde(flatten)]
    pub item: ExtractedLineItem,
    pub category: Category,
    pub normalized_name: String,
    pub confidence: f64,
}

impl EnrichedLineItem {
    pub fn new(
        item: &ExtractedLineItem,
        category: Category,
        normalized_name: String,
        confidence: f64,
    ) -> Self {
        Self {
            item: item.clone(),
            category,
            normalized_name,
            confidence,
        }
    }
}
