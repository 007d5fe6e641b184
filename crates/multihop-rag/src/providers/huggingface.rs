//! Hugging Face hosted inference backend
//!
//! Used as the alternative hosted models in the generation cascade.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::resolve_api_key;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::llm::{error_from_response, http_client, GenerationBackend};

/// Text-generation backend for one hosted model
pub struct HuggingFaceBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    name: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl HuggingFaceBackend {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<&str>,
        api_key_env: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            name: format!("huggingface:{}", model),
            api_key: resolve_api_key(api_key, api_key_env),
            temperature,
            max_tokens,
        })
    }
}

#[derive(Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

/// Pull the generated text out of an inference payload.
///
/// The API answers either `[{"generated_text": ...}]`, a bare object with the
/// same field, or `{"error": ...}` (e.g. while the model is loading).
fn extract_generated_text(provider: &str, payload: &Value) -> Result<String> {
    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        return Err(Error::provider(provider, error.to_string()));
    }

    let item = match payload {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(payload),
        _ => None,
    };

    item.and_then(|i| i.get("generated_text"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| Error::provider(provider, "no generated_text in response"))
}

#[async_trait]
impl GenerationBackend for HuggingFaceBackend {
    async fn generate(&self, query: &str, context: &str) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::unavailable(&self.name, "API token not configured"))?;

        let request = InferenceRequest {
            inputs: format!(
                "{}\n\n{}",
                PromptBuilder::system_instruction(),
                PromptBuilder::build_rag_prompt(query, context)
            ),
            parameters: InferenceParameters {
                max_new_tokens: self.max_tokens,
                temperature: self.temperature,
                return_full_text: false,
            },
        };

        tracing::info!("Generating answer with hosted model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, self.model))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::provider(&self.name, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(&self.name, response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::provider(&self.name, format!("malformed response: {}", e)))?;

        extract_generated_text(&self.name, &payload)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}
