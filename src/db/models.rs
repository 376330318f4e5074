use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::models::ChatRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Tradition,
    Craft,
    Music,
    Dance,
    Cuisine,
    Festival,
    Architecture,
    Language,
    Folklore,
    Ritual,
    Art,
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Tradition,
        Category::Craft,
        Category::Music,
        Category::Dance,
        Category::Cuisine,
        Category::Festival,
        Category::Architecture,
        Category::Language,
        Category::Folklore,
        Category::Ritual,
        Category::Art,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tradition => "tradition",
            Category::Craft => "craft",
            Category::Music => "music",
            Category::Dance => "dance",
            Category::Cuisine => "cuisine",
            Category::Festival => "festival",
            Category::Architecture => "architecture",
            Category::Language => "language",
            Category::Folklore => "folklore",
            Category::Ritual => "ritual",
            Category::Art => "art",
            Category::Other => "other",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A heritage entry as seen by the AI layer. Entries are read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub cultural_context: Option<String>,
    pub category: Category,
    pub country: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub cultural_context: Option<String>,
    pub category: Category,
    pub country: Option<String>,
    pub published: bool,
}
