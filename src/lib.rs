pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::use_cases::budget_import::BudgetImportUseCase;
pub use application::use_cases::category_classifier::{
    Classification, DeterministicClassifier, LineItemClassifier,
};
pub use domain::cost_record::{to_cost_record, to_cost_records, CostLineRecord};
pub use domain::error::{AppError, Result};
pub use domain::extraction::{ExtractionResult, ImportResult};
pub use domain::grid::Grid;
pub use domain::import_config::{AssistConfig, EngineSettings, ExtractionConfig};
pub use infrastructure::grid::read_grid;

/// Install the default `tracing` subscriber, honouring `RUST_LOG`.
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
