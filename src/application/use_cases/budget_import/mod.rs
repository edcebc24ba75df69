// ============================================================
// BUDGET IMPORT
// ============================================================
// Runs the extraction stages in order over one grid, then labels the
// items. Fatal stage conditions stop the run with success = false; all
// other diagnostics are concatenated in stage order.


use crate::application::use_cases::assisted_classifier::AssistedClassifier;
use crate::application::use_cases::category_classifier::{
    DeterministicClassifier, LineItemClassifier,
};
use crate::application::use_cases::column_mapper::ColumnMapper;
use crate::application::use_cases::header_locator::HeaderLocator;
use crate::application::use_cases::line_item_extractor::LineItemExtractor;
use crate::application::use_cases::region_detector::RegionDetector;
use crate::application::use_cases::totals_validator::validate_totals;
use crate::domain::cost_record::{to_cost_records, CostLineRecord};
use crate::domain::error::{AppError, Result};
use crate::domain::extraction::{ExtractionMetadata, ExtractionResult, ImportResult, StopReason};
use crate::domain::grid::Grid;
use crate::domain::import_config::{EngineSettings, ExtractionConfig};
use crate::domain::line_item::EnrichedLineItem;
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::grid::read_grid;
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub struct BudgetImportUseCase {
    config: ExtractionConfig,
    classifier: Arc<dyn LineItemClassifier>,
}

impl BudgetImportUseCase {
    pub fn new(config: ExtractionConfig, classifier: Arc<dyn LineItemClassifier>) -> Self {
        Self { config, classifier }
    }

    pub fn deterministic(config: ExtractionConfig) -> Self {
        let classifier = Arc::new(DeterministicClassifier::new(config.clone()));
        Self::new(config, classifier)
    }

    /// Assisted classification only when enabled and a client is supplied
    pub fn from_settings(
        settings: EngineSettings,
        llm_client: Option<Arc<dyn LLMClient + Send + Sync>>,
    ) -> Self {
        match llm_client {
            Some(client) if settings.assist.enabled => {
                let fallback = DeterministicClassifier::new(settings.extraction.clone());
                let classifier = Arc::new(AssistedClassifier::new(client, settings.assist, fallback));
                Self::new(settings.extraction, classifier)
            }
            _ => Self::deterministic(settings.extraction),
        }
    }

    /// Load settings (file, env, keyring) and wire the HTTP assistant if enabled
    pub fn from_environment(config_file: Option<&Path>) -> Result<Self> {
        let config_service = ConfigService::new();
        let mut settings = config_service.load_settings(config_file)?;
        config_service.resolve_api_key(&mut settings)?;

        let client: Option<Arc<dyn LLMClient + Send + Sync>> = if settings.assist.enabled {
            Some(Arc::new(RouterClient::new()))
        } else {
            None
        };
        Ok(Self::from_settings(settings, client))
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Deterministic stages only. Never fails; problems come back as warnings.
    pub fn extract(&self, grid: &Grid) -> ExtractionResult {
        let mut warnings = Vec::new();
        let mut metadata = ExtractionMetadata {
            source_fingerprint: grid.fingerprint(),
            ..ExtractionMetadata::default()
        };

        let search = HeaderLocator::new(&self.config).locate(grid);
        warnings.extend(search.warnings);
        let Some(header) = search.header else {
            info!(rows = grid.row_count(), "No header row; import aborted");
            return ExtractionResult::failed(warnings, metadata);
        };
        metadata.header_row = Some(header.row);

        let mapped = ColumnMapper::new(&self.config).map(grid, header.row);
        let fatal_mapping = mapped.is_fatal();
        warnings.extend(mapped.warnings);
        metadata.mapping_confidence = mapped.mapping.confidence;
        metadata.mapping = Some(mapped.mapping.clone());
        if fatal_mapping {
            info!(header_row = header.row, "Required columns missing; import aborted");
            return ExtractionResult::failed(warnings, metadata);
        }
        let mapping = mapped.mapping;

        let detected = RegionDetector::new(&self.config).detect(grid, &mapping, header.row);
        warnings.extend(detected.warnings);
        let region = detected.region;
        metadata.rows_scanned = region.len();
        metadata.stop_row = match region.stop_reason {
            StopReason::EndOfGrid => None,
            _ => Some(region.end),
        };
        metadata.stop_reason = Some(region.stop_reason.clone());

        let extracted = LineItemExtractor::new(&self.config).extract(grid, &mapping, &region);
        warnings.extend(extracted.warnings);
        metadata.rows_extracted = extracted.rows_extracted;
        metadata.compound_splits = extracted.compound_splits;

        let totals = validate_totals(&extracted.items, &self.config);
        warnings.extend(totals.warnings);
        metadata.total_cost = totals.total_cost;
        metadata.total_price = totals.total_price;

        info!(
            header_row = header.row,
            confidence = metadata.mapping_confidence,
            region_start = region.start,
            region_end = region.end,
            items = extracted.items.len(),
            total_cost = metadata.total_cost,
            warnings = warnings.len(),
            "Extraction finished"
        );

        ExtractionResult {
            success: true,
            items: extracted.items,
            warnings,
            metadata,
        }
    }

    /// Extraction followed by classification; the only awaited step is the classifier
    pub async fn import(&self, grid: &Grid) -> ImportResult {
        let import_id = Uuid::new_v4();
        let span = info_span!("budget_import", %import_id);

        async {
            let extraction = self.extract(grid);
            let classification = self.classifier.classify(&extraction.items).await;

            ImportResult {
                import_id,
                success: extraction.success,
                items: classification.items,
                warnings: extraction.warnings,
                metadata: extraction.metadata,
                classification: classification.source,
            }
        }
        .instrument(span)
        .await
    }

    /// Read a CSV or spreadsheet export and import it
    pub async fn import_file(&self, path: &Path) -> Result<ImportResult> {
        let grid = read_grid(path)?;
        if grid.is_empty() {
            return Err(AppError::ValidationError(format!(
                "{} contains no cells",
                path.display()
            )));
        }
        Ok(self.import(&grid).await)
    }

    /// Persisted-record shape for the items a reviewer accepted, selected
    /// by index into `items`
    pub fn to_cost_records(
        &self,
        items: &[EnrichedLineItem],
        selected: Option<&[usize]>,
    ) -> Vec<CostLineRecord> {
        to_cost_records(items, selected, &self.config)
    }
}
