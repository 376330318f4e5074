use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::{
    models::{Generation, GenerationRequest, Usage},
    token_count, ProviderError, TextGenerationProvider,
};

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: String, default_model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            default_model,
        }
    }

    fn build_body(&self, request: &GenerationRequest) -> Value {
        let mut messages = vec![json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        messages.extend(
            request
                .conversation()
                .into_iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
        );

        json!({
            "model": self.default_model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    fn parse_response(json: &Value) -> Result<(String, Option<Usage>), ProviderError> {
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::Unknown("OpenAI response had no message content".to_string()))?
            .to_string();

        let usage = json.get("usage").map(|u| Usage {
            input_tokens: token_count(&u["prompt_tokens"]),
            output_tokens: token_count(&u["completion_tokens"]),
        });

        Ok((content, usage))
    }
}

#[async_trait]
impl TextGenerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let body = self.build_body(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
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
