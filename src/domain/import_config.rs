use super::llm_config::LLMConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the deterministic extraction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Rows scanned when looking for the header (default: 60)
    pub header_scan_limit: usize,

    /// Minimum score for a row to qualify as header (default: 4.0)
    pub header_min_score: f64,

    /// Rows with more currency-shaped cells than this are penalized (default: 3)
    pub currency_cell_limit: usize,

    /// Minimum confidence to accept a header-to-column match (default: 0.6)
    pub column_min_confidence: f64,

    /// Overall mapping confidence below this raises LOW_CONFIDENCE_MAPPING (default: 0.7)
    pub low_confidence_threshold: f64,

    /// Consecutive structurally empty rows that end the table (default: 3)
    pub empty_row_run: usize,

    /// Aggregate price below this share of cost raises TOTAL_MISMATCH (default: 0.9)
    pub total_mismatch_ratio: f64,

    /// Vendor name standing for the company's own forces (default: "RCG")
    pub internal_vendor: String,

    /// Vendor cell spellings that also mean internal
    pub internal_vendor_aliases: Vec<String>,

    /// Hourly rate used to express internal labor as hours; None keeps lump sums
    pub internal_labor_hourly_rate: Option<f64>,

    /// Additional stop phrases on top of the built-in vocabulary
    pub extra_stop_phrases: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            header_scan_limit: 60,
            header_min_score: 4.0,
            currency_cell_limit: 3,
            column_min_confidence: 0.6,
            low_confidence_threshold: 0.7,
            empty_row_run: 3,
            total_mismatch_ratio: 0.9,
            internal_vendor: "RCG".to_string(),
            internal_vendor_aliases: vec![
                "internal".to_string(),
                "in-house".to_string(),
                "in house".to_string(),
                "self".to_string(),
                "own forces".to_string(),
            ],
            internal_labor_hourly_rate: None,
            extra_stop_phrases: Vec::new(),
        }
    }
}

impl ExtractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a vendor cell names the company itself
    pub fn is_internal_vendor(&self, vendor: &str) -> bool {
        let vendor = vendor.trim();
        vendor.eq_ignore_ascii_case(self.internal_vendor.trim())
            || self
                .internal_vendor_aliases
                .iter()
                .any(|alias| vendor.eq_ignore_ascii_case(alias.trim()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.header_scan_limit == 0 {
            return Err("header_scan_limit must be > 0".to_string());
        }
        if self.header_min_score <= 0.0 {
            return Err("header_min_score must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.column_min_confidence) {
            return Err("column_min_confidence must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            return Err("low_confidence_threshold must be between 0.0 and 1.0".to_string());
        }
        if self.empty_row_run < 2 {
            return Err("empty_row_run must be >= 2".to_string());
        }
        if !(0.0..=1.0).contains(&self.total_mismatch_ratio) {
            return Err("total_mismatch_ratio must be between 0.0 and 1.0".to_string());
        }
        if self.internal_vendor.trim().is_empty() {
            return Err("internal_vendor must not be blank".to_string());
        }
        if let Some(rate) = self.internal_labor_hourly_rate {
            if !(rate > 0.0) {
                return Err("internal_labor_hourly_rate must be > 0".to_string());
            }
        }
        Ok(())
    }
}

/// Configuration for the optional classification assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub enabled: bool,
    pub llm: LLMConfig,
    /// Per-batch timeout in seconds (default: 15)
    pub timeout_secs: u64,
    /// Items per assistant request (default: 50)
    pub batch_size: usize,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            llm: LLMConfig::default(),
            timeout_secs: 15,
            batch_size: 50,
        }
    }
}

impl AssistConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        Ok(())
    }
}

/// Everything the engine reads from settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub extraction: ExtractionConfig,
    pub assist: AssistConfig,
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), String> {
        self.extraction.validate()?;
        self.assist.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineSettings::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let config = ExtractionConfig {
            column_min_confidence: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExtractionConfig {
            internal_labor_hourly_rate: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let assist = AssistConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(assist.validate().is_err());
    }

    #[test]
    fn test_internal_vendor_matching() {
        let config = ExtractionConfig::default();
        assert!(config.is_internal_vendor("rcg"));
        assert!(config.is_internal_vendor(" In-House "));
        assert!(!config.is_internal_vendor("Acme Electric"));
    }
}
