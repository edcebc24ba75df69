use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum LLMProvider {
    Local,
    OpenAI,
    OpenRouter,
    Google,
}

impl LLMProvider {
    /// Keyring user name for this provider's API key
    pub fn key_name(&self) -> &'static str {
        match self {
            LLMProvider::Local => "local",
            LLMProvider::OpenAI => "openai",
            LLMProvider::OpenRouter => "openrouter",
            LLMProvider::Google => "google",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Local,
            base_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            api_key: None,
            max_tokens: Some(2048),
            temperature: Some(0.0),
        }
    }
}
