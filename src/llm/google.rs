use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::{
    models::{ChatRole, Generation, GenerationRequest, Usage},
    token_count, ProviderError, TextGenerationProvider,
};

pub struct GoogleProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl GoogleProvider {
    pub fn new(api_key: String, base_url: String, default_model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            default_model,
        }
    }

    fn translate_role(role: ChatRole) -> &'static str {
        match role {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        }
    }

    fn build_body(request: &GenerationRequest) -> Value {
        let contents: Vec<Value> = request
            .conversation()
            .into_iter()
            .skip_while(|m| m.role == ChatRole::Assistant)
            .map(|m| {
                json!({
                    "role": Self::translate_role(m.role),
                    "parts": [{ "text": m.content }],
                })
            })
            .collect();

        json!({
            "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
            "contents": contents,
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            },
        })
    }

    fn parse_response(json: &Value) -> Result<(String, Option<Usage>), ProviderError> {
        let candidate = &json["candidates"][0];
        let content: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();

        if content.is_empty() {
            let reason = json["promptFeedback"]["blockReason"]
                .as_str()
                .or_else(|| candidate["finishReason"].as_str())
                .unwrap_or("no candidates");
            return Err(ProviderError::Unknown(format!("Gemini returned no text ({})", reason)));
        }

        let usage = json.get("usageMetadata").map(|u| Usage {
            input_tokens: token_count(&u["promptTokenCount"]),
            output_tokens: token_count(&u["candidatesTokenCount"]),
        });

        Ok((content, usage))
    }
}

#[async_trait]
impl TextGenerationProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let body = Self::build_body(request);

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.default_model))
            .header("x-goog-api-key", &self.api_key)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::Message;

    #[test]
    fn assistant_turns_become_model_role() {
        let request = GenerationRequest {
            system_prompt: "sys".into(),
            user_prompt: "question".into(),
            history: vec![Message::user("earlier"), Message::assistant("reply")],
            temperature: 1.0,
            max_tokens: 64,
        };

        let body = GoogleProvider::build_body(&request);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 64);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
    }

    #[test]
    fn parses_candidate_parts() {
        let json = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Batik "}, {"text": "motifs"}]}}],
            "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 2}
        });
        let (text, usage) = GoogleProvider::parse_response(&json).unwrap();
        assert_eq!(text, "Batik motifs");
        assert_eq!(usage.unwrap().input_tokens, 20);
    }

    #[test]
    fn blocked_prompt_is_unknown_error() {
        let json = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        match GoogleProvider::parse_response(&json) {
            Err(ProviderError::Unknown(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
