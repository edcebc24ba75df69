pub mod assisted_classifier;
pub mod budget_import;
pub mod category_classifier;
pub mod column_mapper;
pub mod header_locator;
pub mod line_item_extractor;
pub mod region_detector;
pub mod synonym_match;
pub mod totals_validator;
