pub mod anthropic;
pub mod google;
pub mod models;
pub mod openai;

use anthropic::AnthropicProvider;
use google::GoogleProvider;
use openai::OpenAiProvider;

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{LlmConfig, ProviderConfig};
use models::{Generation, GenerationRequest};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    #[error("Provider quota exceeded")]
    QuotaExceeded,
    #[error("Rate Limited")]
    RateLimited,
    #[error("Prompt exceeds the model context length")]
    ContextTooLong,
    #[error("Provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Classifies a non-success vendor response.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let lowered = body.to_lowercase();
        let mentions_context = ["context_length", "maximum context", "too long", "too many tokens"]
            .iter()
            .any(|needle| lowered.contains(needle));

        match status {
            StatusCode::TOO_MANY_REQUESTS if lowered.contains("quota") => ProviderError::QuotaExceeded,
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
            StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE if mentions_context => {
                ProviderError::ContextTooLong
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::Unavailable(format!("credentials rejected ({})", status))
            }
            s if s.is_server_error() => ProviderError::Unavailable(format!("upstream returned {}", s)),
            s => ProviderError::Unknown(format!("{}: {}", s, truncate_body(body))),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Unknown(e.to_string())
        } else {
            ProviderError::Unavailable(e.to_string())
        }
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Reads a vendor token counter, saturating at `u32::MAX`. Missing counters read as 0.
pub(crate) fn token_count(value: &serde_json::Value) -> u32 {
    value
        .as_u64()
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Uniform chat-completion call shared by every vendor.
#[async_trait]
pub trait TextGenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError>;
}

/// Builds the configured provider once at startup.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Returns `None` when the selected provider is unknown or lacks
    /// credentials; the gateway then stays in degraded mode.
    pub fn create(config: &LlmConfig) -> Option<Arc<dyn TextGenerationProvider>> {
        let provider_name = config.provider.trim().to_lowercase();

        let provider: Arc<dyn TextGenerationProvider> = match provider_name.as_str() {
            "openai" => {
                let cfg = usable(&provider_name, config.openai.as_ref())?;
                Arc::new(OpenAiProvider::new(
                    cfg.api_key.clone(),
                    cfg.api_base.clone(),
                    cfg.default_model.clone(),
                ))
            }
            "anthropic" => {
                let cfg = usable(&provider_name, config.anthropic.as_ref())?;
                Arc::new(AnthropicProvider::new(
                    cfg.api_key.clone(),
                    cfg.api_base.clone(),
                    cfg.default_model.clone(),
                ))
            }
            "google" | "gemini" => {
                let cfg = usable(&provider_name, config.google.as_ref())?;
                Arc::new(GoogleProvider::new(
                    cfg.api_key.clone(),
                    cfg.api_base.clone(),
                    cfg.default_model.clone(),
                ))
            }
            "" => {
                warn!("No LLM provider selected, AI features disabled");
                return None;
            }
            other => {
                warn!(provider = other, "Unsupported LLM provider, AI features disabled");
                return None;
            }
        };

        info!(provider = provider.name(), model = provider.model(), "LLM provider configured");
        Some(provider)
    }
}

fn usable<'a>(name: &str, cfg: Option<&'a ProviderConfig>) -> Option<&'a ProviderConfig> {
    match cfg {
        Some(cfg) if !cfg.api_key.trim().is_empty() => Some(cfg),
        Some(_) => {
            warn!(provider = name, "LLM provider has no API key, AI features disabled");
            None
        }
        None => {
            warn!(provider = name, "LLM provider section missing, AI features disabled");
            None
        }
    }
}
