//! Business category assignment
//!
//! The deterministic classifier runs an ordered list of override rules and
//! falls back to the cost component. Classifiers only label items; they
//! never touch amounts, order or count.

use crate::domain::extraction::ClassificationSource;
use crate::domain::import_config::ExtractionConfig;
use crate::domain::line_item::{Category, CostComponent, EnrichedLineItem, ExtractedLineItem};
use crate::shared::text::{contains_words, normalize};
use async_trait::async_trait;

/// Words in an item name that mark it as management overhead
pub const MANAGEMENT_VOCABULARY: &[&str] = &[
    "management",
    "manager",
    "project manager",
    "supervision",
    "supervisor",
    "superintendent",
];

/// Labelled items plus which path produced the labels
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub items: Vec<EnrichedLineItem>,
    pub source: ClassificationSource,
}

#[async_trait]
pub trait LineItemClassifier: Send + Sync {
    /// Output has the same length and order as `items`
    async fn classify(&self, items: &[ExtractedLineItem]) -> Classification;
}

/// One override rule. Returning `None` passes the item to the next rule.
pub trait CategoryRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, item: &ExtractedLineItem, config: &ExtractionConfig) -> Option<Category>;
}

/// Internal crew billed at exactly zero markup is overhead
pub struct InternalZeroMarkupRule;

impl CategoryRule for InternalZeroMarkupRule {
    fn name(&self) -> &'static str {
        "internal_zero_markup"
    }

    fn apply(&self, item: &ExtractedLineItem, config: &ExtractionConfig) -> Option<Category> {
        let internal = item
            .vendor
            .as_deref()
            .map(|v| config.is_internal_vendor(v))
            .unwrap_or(false);
        let zero_markup = item.markup == Some(0.0);

        (internal && zero_markup).then_some(Category::Management)
    }
}

pub struct ManagementVocabularyRule;

impl CategoryRule for ManagementVocabularyRule {
    fn name(&self) -> &'static str {
        "management_vocabulary"
    }

    fn apply(&self, item: &ExtractedLineItem, _config: &ExtractionConfig) -> Option<Category> {
        let name = normalize(&item.name);
        MANAGEMENT_VOCABULARY
            .iter()
            .any(|word| contains_words(&name, word))
            .then_some(Category::Management)
    }
}

/// Terminal rule; always answers
pub struct ComponentRule;

impl CategoryRule for ComponentRule {
    fn name(&self) -> &'static str {
        "component"
    }

    fn apply(&self, item: &ExtractedLineItem, _config: &ExtractionConfig) -> Option<Category> {
        Some(component_category(item.component))
    }
}

pub fn component_category(component: CostComponent) -> Category {
    match component {
        CostComponent::Labor => Category::InternalLabor,
        CostComponent::Material => Category::Materials,
        CostComponent::Subcontract => Category::Subcontractors,
    }
}

pub struct RuleSet {
    rules: Vec<Box<dyn CategoryRule>>,
}

impl RuleSet {
    pub fn new(rules: Vec<Box<dyn CategoryRule>>) -> Self {
        Self { rules }
    }

    /// First matching rule wins; the cost component decides when none match
    pub fn categorize(&self, item: &ExtractedLineItem, config: &ExtractionConfig) -> Category {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(item, config))
            .unwrap_or_else(|| component_category(item.component))
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(vec![
            Box::new(InternalZeroMarkupRule),
            Box::new(ManagementVocabularyRule),
            Box::new(ComponentRule),
        ])
    }
}

/// Display name: trimmed, inner whitespace collapsed, case preserved
pub fn display_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct DeterministicClassifier {
    config: ExtractionConfig,
    rules: RuleSet,
}

impl DeterministicClassifier {
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_rules(config, RuleSet::default())
    }

    pub fn with_rules(config: ExtractionConfig, rules: RuleSet) -> Self {
        Self { config, rules }
    }

    pub fn enrich(&self, item: &ExtractedLineItem) -> EnrichedLineItem {
        let category = self.rules.categorize(item, &self.config);
        EnrichedLineItem::new(item, category, display_name(&item.name), 1.0)
    }

    pub fn enrich_all(&self, items: &[ExtractedLineItem]) -> Vec<EnrichedLineItem> {
        items.iter().map(|item| self.enrich(item)).collect()
    }
}

#[async_trait]
impl LineItemClassifier for DeterministicClassifier {
    async fn classify(&self, items: &[ExtractedLineItem]) -> Classification {
        Classification {
            items: self.enrich_all(items),
            source: ClassificationSource::Deterministic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, component: CostComponent, vendor: Option<&str>, markup: Option<f64>) -> ExtractedLineItem {
        ExtractedLineItem {
            source_row: 4,
            source_item_text: name.to_string(),
            name: name.to_string(),
            component,
            vendor: vendor.map(|v| v.to_string()),
            cost: 3000.0,
            markup,
            price: markup.map(|m| 3000.0 * (1.0 + m)),
            was_split: false,
            split_from_name: None,
        }
    }

    fn classifier() -> DeterministicClassifier {
        DeterministicClassifier::new(ExtractionConfig::default())
    }

    #[test]
    fn test_component_mapping() {
        let c = classifier();
        assert_eq!(
            c.enrich(&item("Demo", CostComponent::Labor, Some("RCG"), Some(0.1))).category,
            Category::InternalLabor
        );
        assert_eq!(
            c.enrich(&item("Lumber", CostComponent::Material, Some("RCG"), Some(0.1))).category,
            Category::Materials
        );
        assert_eq!(
            c.enrich(&item("Roofing", CostComponent::Subcontract, Some("Acme"), Some(0.1))).category,
            Category::Subcontractors
        );
    }

    #[test]
    fn test_internal_vendor_zero_markup_is_management() {
        let enriched = classifier().enrich(&item(
            "Site cleanup",
            CostComponent::Labor,
            Some("rcg"),
            Some(0.0),
        ));
        assert_eq!(enriched.category, Category::Management);
        assert_eq!(enriched.confidence, 1.0);
    }

    #[test]
    fn test_small_markup_is_not_zero_markup() {
        let enriched = classifier().enrich(&item(
            "Site cleanup",
            CostComponent::Labor,
            Some("RCG"),
            Some(0.004),
        ));
        assert_eq!(enriched.category, Category::InternalLabor);
    }

    #[test]
    fn test_missing_markup_is_not_zero_markup() {
        let enriched = classifier().enrich(&item("Site cleanup", CostComponent::Labor, Some("RCG"), None));
        assert_eq!(enriched.category, Category::InternalLabor);
    }

    #[test]
    fn test_external_vendor_zero_markup_keeps_component() {
        let enriched = classifier().enrich(&item(
            "Electrical",
            CostComponent::Subcontract,
            Some("Sparks LLC"),
            Some(0.0),
        ));
        assert_eq!(enriched.category, Category::Subcontractors);
    }

    #[test]
    fn test_management_vocabulary_overrides_any_component() {
        let c = classifier();
        for component in [CostComponent::Labor, CostComponent::Material, CostComponent::Subcontract] {
            let enriched = c.enrich(&item("Site Supervision", component, None, Some(0.2)));
            assert_eq!(enriched.category, Category::Management);
        }
        assert_eq!(
            c.enrich(&item("Superintendent", CostComponent::Labor, None, Some(0.2))).category,
            Category::Management
        );
    }

    #[test]
    fn test_vocabulary_needs_whole_words() {
        let enriched = classifier().enrich(&item(
            "Stormwater managementless",
            CostComponent::Material,
            None,
            Some(0.2),
        ));
        assert_eq!(enriched.category, Category::Materials);
    }

    #[test]
    fn test_display_name_collapses_whitespace() {
        let enriched = classifier().enrich(&item("  Framing   -  Materials ", CostComponent::Material, None, None));
        assert_eq!(enriched.normalized_name, "Framing - Materials");
        assert_eq!(enriched.item.name, "  Framing   -  Materials ");
    }

    #[test]
    fn test_custom_rule_set_order() {
        let rules = RuleSet::new(vec![Box::new(ComponentRule), Box::new(ManagementVocabularyRule)]);
        assert_eq!(rules.rule_names(), vec!["component", "management_vocabulary"]);

        let c = DeterministicClassifier::with_rules(ExtractionConfig::default(), rules);
        assert_eq!(
            c.enrich(&item("Supervision", CostComponent::Labor, None, None)).category,
            Category::InternalLabor
        );
    }

    #[tokio::test]
    async fn test_classify_preserves_amounts_and_order() {
        let items = vec![
            item("Supervision", CostComponent::Labor, Some("RCG"), Some(0.0)),
            item("Lumber", CostComponent::Material, Some("RCG"), Some(0.2)),
        ];

        let result = classifier().classify(&items).await;

        assert_eq!(result.source, ClassificationSource::Deterministic);
        assert_eq!(result.items.len(), 2);
        for (enriched, original) in result.items.iter().zip(&items) {
            assert_eq!(&enriched.item, original);
        }
    }
}
