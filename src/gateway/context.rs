use tracing::warn;
use uuid::Uuid;

use crate::db::{self, models::Entry, service::DbService, DbPool, StoreError};
use crate::llm::models::Message;

pub const MAX_REFERENCE_ENTRIES: usize = 5;
pub const MAX_HISTORY_MESSAGES: usize = 5;
pub const TITLE_BUDGET: usize = 100;
pub const DESCRIPTION_BUDGET: usize = 200;
pub const CULTURAL_CONTEXT_BUDGET: usize = 150;

const ELLIPSIS: &str = "...";

/// Cuts `text` to at most `budget` characters, marking the cut with `...`
/// inside the budget.
pub fn truncate_chars(text: &str, budget: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= budget {
        return text.to_string();
    }
    if budget <= ELLIPSIS.len() {
        return text.chars().take(budget).collect();
    }
    let mut cut: String = text.chars().take(budget - ELLIPSIS.len()).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Prompt-sized projection of an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDocument {
    pub title: String,
    pub description: String,
    pub cultural_context: Option<String>,
    pub category: String,
    pub country: Option<String>,
}

impl From<&Entry> for ReferenceDocument {
    fn from(entry: &Entry) -> Self {
        Self {
            title: truncate_chars(&entry.title, TITLE_BUDGET),
            description: truncate_chars(&entry.description, DESCRIPTION_BUDGET),
            cultural_context: entry
                .cultural_context
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map(|c| truncate_chars(c, CULTURAL_CONTEXT_BUDGET)),
            category: entry.category.to_string(),
            country: entry.country.clone().filter(|c| !c.trim().is_empty()),
        }
    }
}

pub fn format_references(docs: &[ReferenceDocument]) -> String {
    let mut block = String::new();
    for (i, doc) in docs.iter().enumerate() {
        if i > 0 {
            block.push('\n');
        }
        block.push_str(&format!("{}. {} ({})\n", i + 1, doc.title, doc.category));
        if let Some(country) = &doc.country {
            block.push_str(&format!("   Location: {}\n", country));
        }
        block.push_str(&format!("   Description: {}\n", doc.description));
        if let Some(context) = &doc.cultural_context {
            block.push_str(&format!("   Cultural context: {}\n", context));
        }
    }
    block
}

/// Replay state for a continued conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    /// Set only when the conversation exists and belongs to the caller.
    pub conversation_id: Option<Uuid>,
    pub history: Vec<Message>,
}

/// Gathers reference documents and conversation history. Lookup failures
/// are logged and degrade to empty context.
pub struct ContextAssembler<'a> {
    pool: &'a DbPool,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    pub fn references(&self, owner_id: &str) -> Vec<ReferenceDocument> {
        match self.load_references(owner_id) {
            Ok(docs) => docs,
            Err(e) => {
                warn!(owner_id, error = %e, "Failed to load reference entries, continuing without them");
                Vec::new()
            }
        }
    }

    fn load_references(&self, owner_id: &str) -> Result<Vec<ReferenceDocument>, StoreError> {
        let conn = db::lock(self.pool)?;
        let entries = DbService::list_published_entries(&conn, owner_id, MAX_REFERENCE_ENTRIES)?;
        Ok(entries.iter().map(ReferenceDocument::from).collect())
    }

    pub fn conversation(&self, conversation_id: Option<Uuid>, owner_id: &str) -> ConversationContext {
        let Some(id) = conversation_id else {
            return ConversationContext::default();
        };

        match self.load_conversation(id, owner_id) {
            Ok(Some(context)) => context,
            Ok(None) => {
                warn!(%id, owner_id, "Conversation not found for owner, starting a new one");
                ConversationContext::default()
            }
            Err(e) => {
                warn!(%id, owner_id, error = %e, "Failed to load conversation history, starting a new one");
                ConversationContext::default()
            }
        }
    }

    fn load_conversation(&self, id: Uuid, owner_id: &str) -> Result<Option<ConversationContext>, StoreError> {
        let conn = db::lock(self.pool)?;
        if DbService::get_owned_conversation(&conn, id, owner_id)?.is_none() {
            return Ok(None);
        }

        let history = DbService::recent_messages(&conn, id, MAX_HISTORY_MESSAGES)?
            .into_iter()
            .map(|m| Message {
                role: m.role,
                content: m.content,
            })
            .collect();

        Ok(Some(ConversationContext {
            conversation_id: Some(id),
            history,
        }))
    }
}
