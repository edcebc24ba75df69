// Layers, lowest precedence first:
//   1. EngineSettings::default()
//   2. optional TOML file
//   3. BUDGET_IMPORT_* environment variables, nested with `__`
//      (e.g. BUDGET_IMPORT_EXTRACTION__INTERNAL_VENDOR=ACME)
//
// A `.env` file in the working directory is loaded into the environment
// first. A missing API key is looked up in the OS keyring.

use crate::domain::error::{AppError, Result};
use crate::domain::import_config::EngineSettings;
use crate::infrastructure::security::keyring::KeyringManager;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::path::Path;
use tracing::{debug, warn};

pub const ENV_PREFIX: &str = "BUDGET_IMPORT_";
pub const KEYRING_SERVICE: &str = "BudgetImport";

pub struct ConfigService {
    keyring: KeyringManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    /// Load and validate settings; the API key is resolved separately
    pub fn load_settings(&self, file: Option<&Path>) -> Result<EngineSettings> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!(error = %e, "Failed to load .env file");
            }
        }

        let settings = Self::figment(file).extract::<EngineSettings>()?;
        settings.validate().map_err(AppError::ConfigError)?;
        debug!(
            assist_enabled = settings.assist.enabled,
            internal_vendor = %settings.extraction.internal_vendor,
            "Engine settings loaded"
        );
        Ok(settings)
    }

    /// Fill `assist.llm.api_key` from the keyring when assist is on and no key was configured
    pub fn resolve_api_key(&self, settings: &mut EngineSettings) -> Result<()> {
        let llm = &mut settings.assist.llm;
        if !settings.assist.enabled || llm.api_key.is_some() {
            return Ok(());
        }

        llm.api_key = self.keyring.get_secret(llm.provider.key_name())?;
        if llm.api_key.is_none() {
            debug!(provider = llm.provider.key_name(), "No API key in keyring");
        }
        Ok(())
    }

    fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(EngineSettings::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
