//! Orchestrates context assembly, provider calls and conversation persistence
//! for each AI request type.

pub mod context;
pub mod prompts;
pub mod requests;
pub mod tags;

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::api::middleware::AuthUser;
use crate::config::{AppConfig, GenerationConfig};
use crate::db::{
    self,
    models::{ConversationDetail, ConversationSummary, Entry},
    service::DbService,
    DbPool, StoreError,
};
use crate::llm::{
    models::{Generation, GenerationRequest, Message},
    ProviderError, ProviderFactory, TextGenerationProvider,
};
use context::{format_references, ContextAssembler};
use requests::{AnalysisRequest, AskRequest, FieldError, SuggestionFocus, SuggestionRequest, TagRequest};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("AI service is not configured")]
    NotConfigured,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<duckdb::Error> for GatewayError {
    fn from(e: duckdb::Error) -> Self {
        GatewayError::Store(StoreError::Database(e))
    }
}

impl From<Vec<FieldError>> for GatewayError {
    fn from(errors: Vec<FieldError>) -> Self {
        GatewayError::Validation(errors)
    }
}

/// Sampling defaults applied when a request leaves them unset.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub default_temperature: f32,
    pub default_max_tokens: u32,
}

impl From<&GenerationConfig> for GatewayConfig {
    fn from(cfg: &GenerationConfig) -> Self {
        Self {
            default_temperature: cfg.default_temperature,
            default_max_tokens: cfg.default_max_tokens,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig::from(&GenerationConfig::default())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer: String,
    pub conversation_id: Uuid,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    pub suggestions: String,
    pub entry_id: Uuid,
    pub focus: SuggestionFocus,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tags {
    pub tags: Vec<String>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub analysis: String,
    pub entry_id: Uuid,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub available: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
}

pub struct Gateway {
    config: GatewayConfig,
    provider: Option<Arc<dyn TextGenerationProvider>>,
    pool: DbPool,
}

impl Gateway {
    pub fn new(config: GatewayConfig, provider: Option<Arc<dyn TextGenerationProvider>>, pool: DbPool) -> Self {
        Self { config, provider, pool }
    }

    /// Opens the store and selects the provider from application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let pool = db::get_connection(&config.database)?;
        let provider = ProviderFactory::create(&config.llm);
        Ok(Self::new(GatewayConfig::from(&config.generation), provider, pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            available: self.provider.is_some(),
            provider: self.provider.as_ref().map(|p| p.name().to_string()),
            model: self.provider.as_ref().map(|p| p.model().to_string()),
        }
    }

    fn provider(&self) -> Result<&Arc<dyn TextGenerationProvider>, GatewayError> {
        self.provider.as_ref().ok_or(GatewayError::NotConfigured)
    }

    fn generation_request(
        &self,
        user_prompt: String,
        history: Vec<Message>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> GenerationRequest {
        GenerationRequest {
            system_prompt: prompts::SYSTEM_PROMPT.to_string(),
            user_prompt,
            history,
            temperature: temperature.unwrap_or(self.config.default_temperature),
            max_tokens: max_tokens.unwrap_or(self.config.default_max_tokens),
        }
    }

    async fn generate(
        &self,
        provider: &Arc<dyn TextGenerationProvider>,
        request: &GenerationRequest,
    ) -> Result<Generation, GatewayError> {
        match provider.generate(request).await {
            Ok(generation) => {
                if let Some(usage) = &generation.usage {
                    info!(
                        provider = provider.name(),
                        model = %generation.model,
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "Generation completed"
                    );
                }
                Ok(generation)
            }
            Err(e) => {
                error!(provider = provider.name(), error = %e, "Generation failed");
                Err(e.into())
            }
        }
    }

    fn load_entry(&self, entry_id: Uuid) -> Result<Entry, GatewayError> {
        let conn = db::lock(&self.pool)?;
        DbService::get_entry(&conn, entry_id)?.ok_or_else(|| GatewayError::NotFound("Entry not found".to_string()))
    }

    /// Answers a question, starting or continuing one of the caller's conversations.
    #[instrument(skip_all, fields(user = %caller.user_id, conversation = ?request.conversation_id))]
    pub async fn ask(&self, caller: &AuthUser, request: AskRequest) -> Result<Answer, GatewayError> {
        request.validate()?;
        let provider = self.provider()?;

        let assembler = ContextAssembler::new(&self.pool);
        let references = if request.include_entries {
            format_references(&assembler.references(&caller.user_id))
        } else {
            String::new()
        };
        let conversation = assembler.conversation(request.conversation_id, &caller.user_id);

        let user_prompt = prompts::ask_prompt(&request.question, request.context.as_deref(), &references);
        let generation_request =
            self.generation_request(user_prompt, conversation.history, request.temperature, request.max_tokens);

        let generation = self.generate(provider, &generation_request).await?;

        let exchange = [
            Message::user(request.question.trim()),
            Message::assistant(generation.text.clone()),
        ];

        let conversation_id = {
            let conn = db::lock(&self.pool)?;
            let appended = match conversation.conversation_id {
                Some(id) => DbService::append_messages(&conn, id, &exchange).map(|stored| stored.then_some(id)),
                None => Ok(None),
            };
            let saved = match appended {
                Ok(Some(id)) => Ok(id),
                Ok(None) => {
                    if let Some(id) = conversation.conversation_id {
                        warn!(%id, "Conversation was deleted during generation, starting a new one");
                    }
                    let title = prompts::conversation_title(&request.question);
                    DbService::create_conversation(&conn, &caller.user_id, &title, &exchange).map(|c| c.id)
                }
                Err(e) => Err(e),
            };
            // The generated answer is not returned when it cannot be stored.
            saved.map_err(|e| {
                error!(conversation = ?conversation.conversation_id, error = %e, "Failed to persist conversation exchange");
                GatewayError::from(e)
            })?
        };

        Ok(Answer {
            answer: generation.text,
            conversation_id,
            provider: provider.name().to_string(),
            model: generation.model,
        })
    }

    #[instrument(skip_all, fields(user = %caller.user_id, entry = %entry_id))]
    pub async fn suggest(
        &self,
        caller: &AuthUser,
        entry_id: Uuid,
        request: SuggestionRequest,
    ) -> Result<Suggestions, GatewayError> {
        let focus = request.validate()?;
        let provider = self.provider()?;

        let entry = self.load_entry(entry_id)?;
        if !caller.can_manage(&entry.owner_id) {
            return Err(GatewayError::Forbidden(
                "You can only request suggestions for your own entries".to_string(),
            ));
        }

        let generation_request = self.generation_request(
            prompts::suggestion_prompt(&entry, focus),
            Vec::new(),
            request.temperature,
            request.max_tokens,
        );
        let generation = self.generate(provider, &generation_request).await?;

        Ok(Suggestions {
            suggestions: generation.text,
            entry_id,
            focus,
            provider: provider.name().to_string(),
            model: generation.model,
        })
    }

    #[instrument(skip_all, fields(user = %caller.user_id))]
    pub async fn generate_tags(&self, caller: &AuthUser, request: TagRequest) -> Result<Tags, GatewayError> {
        let category = request.validate()?;
        let provider = self.provider()?;

        let generation_request = self.generation_request(
            prompts::tags_prompt(
                &request.title,
                &request.description,
                category,
                request.cultural_context.as_deref(),
            ),
            Vec::new(),
            request.temperature,
            request.max_tokens,
        );
        let generation = self.generate(provider, &generation_request).await?;

        Ok(Tags {
            tags: tags::parse_tags(&generation.text),
            provider: provider.name().to_string(),
            model: generation.model,
        })
    }

    #[instrument(skip_all, fields(user = %caller.user_id, entry = %entry_id))]
    pub async fn analyze(
        &self,
        caller: &AuthUser,
        entry_id: Uuid,
        request: AnalysisRequest,
    ) -> Result<Analysis, GatewayError> {
        request.validate()?;
        let provider = self.provider()?;

        let entry = self.load_entry(entry_id)?;
        // Unpublished entries stay invisible to everyone but their owner and admins.
        if !entry.published && !caller.can_manage(&entry.owner_id) {
            return Err(GatewayError::NotFound("Entry not found".to_string()));
        }

        let generation_request = self.generation_request(
            prompts::analysis_prompt(&entry),
            Vec::new(),
            request.temperature,
            request.max_tokens,
        );
        let generation = self.generate(provider, &generation_request).await?;

        Ok(Analysis {
            analysis: generation.text,
            entry_id,
            provider: provider.name().to_string(),
            model: generation.model,
        })
    }

    pub fn list_conversations(
        &self,
        caller: &AuthUser,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ConversationSummary>, GatewayError> {
        let conn = db::lock(&self.pool)?;
        Ok(DbService::list_conversations(&conn, &caller.user_id, limit, offset)?)
    }

    pub fn get_conversation(&self, caller: &AuthUser, id: Uuid) -> Result<ConversationDetail, GatewayError> {
        let conn = db::lock(&self.pool)?;
        DbService::get_conversation_detail(&conn, id, &caller.user_id)?
            .ok_or_else(|| GatewayError::NotFound("Conversation not found".to_string()))
    }

    /// Plain-text transcript of one of the caller's conversations.
    pub fn export_conversation(&self, caller: &AuthUser, id: Uuid) -> Result<String, GatewayError> {
        let detail = self.get_conversation(caller, id)?;

        let mut export = String::new();
        export.push_str(&format!("Conversation: {}\n", detail.conversation.title));
        export.push_str(&format!("ID: {}\n", detail.conversation.id));
        export.push_str(&format!("Created At: {}\n", detail.conversation.created_at));
        export.push_str("---\n");

        for m in detail.messages {
            export.push_str(&format!("[{}]: {}\n", m.role.as_str().to_uppercase(), m.content));
            export.push_str("---\n");
        }

        Ok(export)
    }

    /// Owners delete their own conversations; admins may delete any.
    pub fn delete_conversation(&self, caller: &AuthUser, id: Uuid) -> Result<(), GatewayError> {
        let conn = db::lock(&self.pool)?;

        let conversation = DbService::get_conversation(&conn, id)?
            .filter(|c| caller.can_manage(&c.owner_id))
            .ok_or_else(|| GatewayError::NotFound("Conversation not found".to_string()))?;

        DbService::delete_conversation(&conn, conversation.id)?;
        info!(%id, user = %caller.user_id, "Conversation deleted");
        Ok(())
    }
}
