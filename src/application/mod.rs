pub mod use_cases;

pub use use_cases::budget_import::BudgetImportUseCase;
