use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::{
    models::{ChatRole, Generation, GenerationRequest, Usage},
    token_count, ProviderError, TextGenerationProvider,
};

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, base_url: String, default_model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            default_model,
        }
    }

    fn build_body(&self, request: &GenerationRequest) -> Value {
        // The system prompt is a top-level field and the message list must open with a user turn.
        let messages: Vec<Value> = request
            .conversation()
            .into_iter()
            .skip_while(|m| m.role == ChatRole::Assistant)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        json!({
            "model": self.default_model,
            "system": request.system_prompt,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    fn parse_response(json: &Value) -> Result<(String, Option<Usage>), ProviderError> {
        let blocks = json["content"]
            .as_array()
            .ok_or_else(|| ProviderError::Unknown("Anthropic response had no content".to_string()))?;

        let content: String = blocks
            .iter()
            .filter(|b| b["type"].as_str().unwrap_or("text") == "text")
            .filter_map(|b| b["text"].as_str())
            .collect();

        if content.is_empty() {
            return Err(ProviderError::Unknown("Anthropic response had no text block".to_string()));
        }

        let usage = json.get("usage").map(|u| Usage {
            input_tokens: token_count(&u["input_tokens"]),
            output_tokens: token_count(&u["output_tokens"]),
        });

        Ok((content, usage))
    }
}

#[async_trait]
impl TextGenerationProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let body = self.build_body(request);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &text));
        }

        let json: Value = response.json().await?;
        let (text, usage) = Self::parse_response(&json)?;

        Ok(Generation {
            text,
            model: self.default_model.clone(),
            usage,
        })
    }
}
