//! Assistant-backed classification with deterministic fallback
//!
//! Items go to the assistant in batches carrying only name, component,
//! vendor, cost and markup. A batch is adopted whole or not at all: any
//! timeout, transport error, malformed entry or length mismatch replaces
//! the whole batch with the deterministic result.

use crate::application::use_cases::category_classifier::{
    display_name, Classification, DeterministicClassifier, LineItemClassifier,
};
use crate::domain::error::{AppError, Result};
use crate::domain::extraction::ClassificationSource;
use crate::domain::import_config::AssistConfig;
use crate::domain::line_item::{Category, CostComponent, EnrichedLineItem, ExtractedLineItem};
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::{clean_llm_response, extract_json_payload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = r#"You label construction budget line items.
The user message is a JSON array of items with fields name, component, vendor, cost and markup.
For every item, in the same order, return an object with:
- "category": one of "internal_labor", "materials", "subcontractors", "management"
- "normalizedName": a short, clean display name for the item
- "confidence": a number from 0.0 to 1.0
Respond with a JSON array only, exactly one entry per input item. Do not change or repeat amounts."#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssistRequestItem<'a> {
    name: &'a str,
    component: CostComponent,
    vendor: Option<&'a str>,
    cost: f64,
    markup: Option<f64>,
}

impl<'a> From<&'a ExtractedLineItem> for AssistRequestItem<'a> {
    fn from(item: &'a ExtractedLineItem) -> Self {
        Self {
            name: &item.name,
            component: item.component,
            vendor: item.vendor.as_deref(),
            cost: item.cost,
            markup: item.markup,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssistResponseItem {
    category: String,
    normalized_name: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AssistResponse {
    Items(Vec<AssistResponseItem>),
    Wrapped { items: Vec<AssistResponseItem> },
}

impl AssistResponse {
    fn into_items(self) -> Vec<AssistResponseItem> {
        match self {
            AssistResponse::Items(items) | AssistResponse::Wrapped { items } => items,
        }
    }
}

pub struct AssistedClassifier {
    client: Arc<dyn LLMClient + Send + Sync>,
    assist: AssistConfig,
    fallback: DeterministicClassifier,
}

impl AssistedClassifier {
    pub fn new(
        client: Arc<dyn LLMClient + Send + Sync>,
        assist: AssistConfig,
        fallback: DeterministicClassifier,
    ) -> Self {
        Self {
            client,
            assist,
            fallback,
        }
    }

    async fn classify_batch(&self, batch: &[ExtractedLineItem]) -> Result<Vec<EnrichedLineItem>> {
        let request: Vec<AssistRequestItem> = batch.iter().map(AssistRequestItem::from).collect();
        let user = serde_json::to_string(&request)
            .map_err(|e| AppError::Internal(format!("Failed to encode assist request: {}", e)))?;

        let response = timeout(
            Duration::from_secs(self.assist.timeout_secs),
            self.client.generate(&self.assist.llm, SYSTEM_PROMPT, &user),
        )
        .await
        .map_err(|_| {
            AppError::LLMError(format!(
                "Classification assistant timed out after {}s",
                self.assist.timeout_secs
            ))
        })??;

        parse_assist_response(&response, batch)
    }
}

#[async_trait]
impl LineItemClassifier for AssistedClassifier {
    async fn classify(&self, items: &[ExtractedLineItem]) -> Classification {
        if items.is_empty() {
            return Classification {
                items: Vec::new(),
                source: ClassificationSource::Deterministic,
            };
        }

        let batch_size = self.assist.batch_size.max(1);
        let mut enriched = Vec::with_capacity(items.len());
        let mut adopted = 0usize;
        let mut fallen_back = 0usize;

        for (batch_idx, batch) in items.chunks(batch_size).enumerate() {
            match self.classify_batch(batch).await {
                Ok(labelled) => {
                    debug!(batch = batch_idx, items = batch.len(), "Assisted batch adopted");
                    adopted += 1;
                    enriched.extend(labelled);
                }
                Err(e) => {
                    warn!(
                        batch = batch_idx,
                        items = batch.len(),
                        error = %e,
                        "Assisted classification failed; using deterministic labels for batch"
                    );
                    fallen_back += 1;
                    enriched.extend(self.fallback.enrich_all(batch));
                }
            }
        }

        let source = match (adopted, fallen_back) {
            (_, 0) => ClassificationSource::Assisted,
            (0, _) => ClassificationSource::Fallback,
            _ => ClassificationSource::PartialFallback,
        };
        info!(adopted, fallen_back, source = ?source, "Classification finished");

        Classification {
            items: enriched,
            source,
        }
    }
}

/// Validate a raw reply against its batch. Any bad entry fails the whole batch.
fn parse_assist_response(
    raw: &str,
    batch: &[ExtractedLineItem],
) -> Result<Vec<EnrichedLineItem>> {
    let payload = extract_json_payload(&clean_llm_response(raw));
    let entries = serde_json::from_str::<AssistResponse>(&payload)
        .map_err(|e| AppError::ParseError(format!("Malformed assistant response: {}", e)))?
        .into_items();

    if entries.len() != batch.len() {
        return Err(AppError::ValidationError(format!(
            "Assistant returned {} entries for {} items",
            entries.len(),
            batch.len()
        )));
    }

    batch
        .iter()
        .zip(entries)
        .enumerate()
        .map(|(idx, (item, entry))| {
            let category: Category = entry.category.parse().map_err(|e| {
                AppError::ValidationError(format!("Entry {}: {}", idx, e))
            })?;

            let name = display_name(&entry.normalized_name);
            if name.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "Entry {}: empty normalizedName",
                    idx
                )));
            }

            if !entry.confidence.is_finite() || !(0.0..=1.0).contains(&entry.confidence) {
                return Err(AppError::ValidationError(format!(
                    "Entry {}: confidence {} outside 0..=1",
                    idx, entry.confidence
                )));
            }

            Ok(EnrichedLineItem::new(item, category, name, entry.confidence))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import_config::ExtractionConfig;
    use crate::domain::llm_config::LLMConfig;
    use std::sync::Mutex;

    enum Reply {
        Text(String),
        Fail,
        Hang,
        /// Valid labels when the batch has this many items, otherwise garbage
        ValidForLen(usize),
    }

    struct FakeClient {
        reply: Reply,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    fn labels(count: usize) -> String {
        let entries: Vec<String> = (0..count)
            .map(|i| {
                format!(
                    r#"{{"category": "subcontractors", "normalizedName": "Item {}", "confidence": 0.8}}"#,
                    i
                )
            })
            .collect();
        format!("[{}]", entries.join(","))
    }

    #[async_trait]
    impl LLMClient for FakeClient {
        async fn generate(&self, _config: &LLMConfig, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            match &self.reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Fail => Err(AppError::LLMError("connection refused".to_string())),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("[]".to_string())
                }
                Reply::ValidForLen(len) => {
                    let sent: Vec<serde_json::Value> = serde_json::from_str(user).unwrap();
                    if sent.len() == *len {
                        Ok(labels(*len))
                    } else {
                        Ok("not json".to_string())
                    }
                }
            }
        }
    }

    fn items() -> Vec<ExtractedLineItem> {
        vec![
            ExtractedLineItem {
                source_row: 7,
                source_item_text: "Supervision".to_string(),
                name: "Supervision".to_string(),
                component: CostComponent::Labor,
                vendor: Some("RCG".to_string()),
                cost: 3000.0,
                markup: Some(0.0),
                price: Some(3000.0),
                was_split: false,
                split_from_name: None,
            },
            ExtractedLineItem {
                source_row: 8,
                source_item_text: "Framing".to_string(),
                name: "Framing - Materials".to_string(),
                component: CostComponent::Material,
                vendor: Some("RCG".to_string()),
                cost: 10000.0,
                markup: Some(0.2),
                price: Some(12000.0),
                was_split: true,
                split_from_name: Some("Framing".to_string()),
            },
            ExtractedLineItem {
                source_row: 8,
                source_item_text: "Framing".to_string(),
                name: "Framing".to_string(),
                component: CostComponent::Subcontract,
                vendor: None,
                cost: 5000.0,
                markup: Some(0.2),
                price: Some(6000.0),
                was_split: true,
                split_from_name: Some("Framing".to_string()),
            },
        ]
    }

    fn classifier(client: Arc<FakeClient>, batch_size: usize) -> AssistedClassifier {
        let assist = AssistConfig {
            enabled: true,
            timeout_secs: 1,
            batch_size,
            ..AssistConfig::default()
        };
        AssistedClassifier::new(
            client,
            assist,
            DeterministicClassifier::new(ExtractionConfig::default()),
        )
    }

    fn deterministic(items: &[ExtractedLineItem]) -> Vec<EnrichedLineItem> {
        DeterministicClassifier::new(ExtractionConfig::default()).enrich_all(items)
    }

    #[tokio::test]
    async fn test_adopts_valid_response() {
        let client = FakeClient::new(Reply::Text(format!("```json\n{}\n```", labels(3))));
        let result = classifier(client, 50).classify(&items()).await;

        assert_eq!(result.source, ClassificationSource::Assisted);
        assert_eq!(result.items.len(), 3);
        assert!(result
            .items
            .iter()
            .all(|i| i.category == Category::Subcontractors && i.confidence == 0.8));
        assert_eq!(result.items[1].normalized_name, "Item 1");
        for (enriched, original) in result.items.iter().zip(items().iter()) {
            assert_eq!(&enriched.item, original);
        }
    }

    #[tokio::test]
    async fn test_wrapped_object_response_is_accepted() {
        let client = FakeClient::new(Reply::Text(format!(r#"{{"items": {}}}"#, labels(3))));
        let result = classifier(client, 50).classify(&items()).await;
        assert_eq!(result.source, ClassificationSource::Assisted);
    }

    #[tokio::test]
    async fn test_length_mismatch_falls_back_byte_identical() {
        let client = FakeClient::new(Reply::Text(labels(2)));
        let result = classifier(client, 50).classify(&items()).await;

        assert_eq!(result.source, ClassificationSource::Fallback);
        assert_eq!(result.items, deterministic(&items()));
        assert_eq!(
            serde_json::to_string(&result.items).unwrap(),
            serde_json::to_string(&deterministic(&items())).unwrap()
        );
    }

    #[tokio::test]
    async fn test_transport_error_falls_back() {
        let client = FakeClient::new(Reply::Fail);
        let result = classifier(client, 50).classify(&items()).await;

        assert_eq!(result.source, ClassificationSource::Fallback);
        assert_eq!(result.items, deterministic(&items()));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let client = FakeClient::new(Reply::Hang);
        let result = classifier(client, 50).classify(&items()).await;

        assert_eq!(result.source, ClassificationSource::Fallback);
        assert_eq!(result.items, deterministic(&items()));
    }

    #[tokio::test]
    async fn test_one_bad_entry_discards_whole_batch() {
        let reply = r#"[
            {"category": "materials", "normalizedName": "Supervision", "confidence": 0.9},
            {"category": "equipment", "normalizedName": "Framing", "confidence": 0.9},
            {"category": "subcontractors", "normalizedName": "Framing", "confidence": 0.9}
        ]"#;
        let client = FakeClient::new(Reply::Text(reply.to_string()));
        let result = classifier(client, 50).classify(&items()).await;

        assert_eq!(result.source, ClassificationSource::Fallback);
        assert_eq!(result.items[0].category, Category::Management);
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_is_rejected() {
        let reply = labels(3).replace("0.8", "1.5");
        let client = FakeClient::new(Reply::Text(reply));
        let result = classifier(client, 50).classify(&items()).await;
        assert_eq!(result.source, ClassificationSource::Fallback);
    }

    #[tokio::test]
    async fn test_batches_fall_back_independently() {
        let client = FakeClient::new(Reply::ValidForLen(2));
        let result = classifier(client.clone(), 2).classify(&items()).await;

        assert_eq!(result.source, ClassificationSource::PartialFallback);
        assert_eq!(client.prompts.lock().unwrap().len(), 2);
        assert_eq!(result.items[0].normalized_name, "Item 0");
        assert_eq!(result.items[1].normalized_name, "Item 1");
        assert_eq!(result.items[2], deterministic(&items()[2..])[0]);
    }

    #[tokio::test]
    async fn test_request_carries_only_allowed_fields() {
        let client = FakeClient::new(Reply::Text(labels(3)));
        classifier(client.clone(), 50).classify(&items()).await;

        let prompts = client.prompts.lock().unwrap();
        let sent: Vec<serde_json::Value> = serde_json::from_str(&prompts[0]).unwrap();
        let keys: Vec<&String> = sent[0].as_object().unwrap().keys().collect();
        let mut keys: Vec<&str> = keys.into_iter().map(|k| k.as_str()).collect();
        keys.sort_unstable();

        assert_eq!(keys, vec!["component", "cost", "markup", "name", "vendor"]);
        assert!(!prompts[0].contains("sourceRow"));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let client = FakeClient::new(Reply::Fail);
        let result = classifier(client.clone(), 50).classify(&[]).await;

        assert!(result.items.is_empty());
        assert!(client.prompts.lock().unwrap().is_empty());
    }
}
