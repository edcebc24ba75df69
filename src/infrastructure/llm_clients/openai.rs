use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use async_trait::async_trait;
use serde_json::json;

/// Chat-completions client for OpenAI, OpenRouter and local OpenAI-style servers
pub struct OpenAICompatibleClient {
    client: reqwest::Client,
}

impl OpenAICompatibleClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Local servers usually run without a key
    fn api_key(config: &LLMConfig) -> Result<Option<String>> {
        match (&config.api_key, &config.provider) {
            (Some(key), _) => Ok(Some(key.clone())),
            (None, LLMProvider::Local) => Ok(None),
            (None, provider) => Err(AppError::LLMError(format!(
                "Missing API key for {:?}",
                provider
            ))),
        }
    }

    pub(crate) fn completions_url(base_url: &str) -> String {
        if base_url.ends_with('/') {
            format!("{}chat/completions", base_url)
        } else {
            format!("{}/chat/completions", base_url)
        }
    }
}

impl Default for OpenAICompatibleClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let api_key = Self::api_key(config)?;
        let url = Self::completions_url(&config.base_url);

        let body = json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user
                }
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url_handles_trailing_slash() {
        assert_eq!(
            OpenAICompatibleClient::completions_url("https://openrouter.ai/api/v1/"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            OpenAICompatibleClient::completions_url("http://localhost:1234/v1"),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let config = LLMConfig::default();
        assert!(OpenAICompatibleClient::api_key(&config).unwrap().is_none());

        let config = LLMConfig {
            provider: LLMProvider::OpenRouter,
            ..LLMConfig::default()
        };
        assert!(OpenAICompatibleClient::api_key(&config).is_err());
    }
}
