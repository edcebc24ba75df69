pub mod columns;
pub mod cost_record;
pub mod error;
pub mod extraction;
pub mod grid;
pub mod import_config;
pub mod line_item;
pub mod llm_config;
pub mod money;
pub mod warning;
