use crate::db::models::{
    Category, Conversation, ConversationDetail, ConversationSummary, Entry, NewEntry, StoredMessage,
};
use crate::llm::models::{ChatRole, Message};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection, Result as DbResult, Row};
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str =
    "c.id, c.owner_id, c.title, CAST(c.created_at AS VARCHAR), CAST(c.updated_at AS VARCHAR)";

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, role, content, CAST(created_at AS VARCHAR)";

const ENTRY_COLUMNS: &str = "id, owner_id, title, description, cultural_context, category, country, \
     published, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

pub struct DbService;

impl DbService {
    // DuckDB renders TIMESTAMP as `YYYY-MM-DD HH:MM:SS[.ffffff]` when cast to VARCHAR.
    fn timestamp_at(row: &Row, idx: usize) -> DbResult<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| Self::conversion_error(idx, format!("invalid timestamp '{}': {}", raw, e)))
    }

    fn uuid_at(row: &Row, idx: usize) -> DbResult<Uuid> {
        let raw: String = row.get(idx)?;
        Uuid::parse_str(&raw).map_err(|e| Self::conversion_error(idx, format!("invalid id '{}': {}", raw, e)))
    }

    fn conversion_error(idx: usize, msg: String) -> duckdb::Error {
        duckdb::Error::FromSqlConversionFailure(idx, duckdb::types::Type::Text, msg.into())
    }

    fn row_to_conversation(row: &Row) -> DbResult<Conversation> {
        Ok(Conversation {
            id: Self::uuid_at(row, 0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            created_at: Self::timestamp_at(row, 3)?,
            updated_at: Self::timestamp_at(row, 4)?,
        })
    }

    fn row_to_summary(row: &Row) -> DbResult<ConversationSummary> {
        Ok(ConversationSummary {
            conversation: Self::row_to_conversation(row)?,
            message_count: row.get(5)?,
        })
    }

    fn row_to_message(row: &Row) -> DbResult<StoredMessage> {
        let role: ChatRole = row
            .get::<_, String>(2)?
            .parse()
            .map_err(|e| Self::conversion_error(2, e))?;

        Ok(StoredMessage {
            id: row.get(0)?,
            conversation_id: Self::uuid_at(row, 1)?,
            role,
            content: row.get(3)?,
            created_at: Self::timestamp_at(row, 4)?,
        })
    }

    fn row_to_entry(row: &Row) -> DbResult<Entry> {
        let category: Category = row
            .get::<_, String>(5)?
            .parse()
            .map_err(|e| Self::conversion_error(5, e))?;

        Ok(Entry {
            id: Self::uuid_at(row, 0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            cultural_context: row.get(4)?,
            category,
            country: row.get(6)?,
            published: row.get(7)?,
            created_at: Self::timestamp_at(row, 8)?,
            updated_at: Self::timestamp_at(row, 9)?,
        })
    }

    fn in_transaction<T>(conn: &Connection, f: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        conn.execute("BEGIN TRANSACTION", [])?;

        match f(conn) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    fn insert_messages(conn: &Connection, conversation_id: Uuid, messages: &[Message]) -> DbResult<()> {
        let mut stmt = conn.prepare("INSERT INTO messages (conversation_id, role, content) VALUES (?, ?, ?)")?;
        for message in messages {
            stmt.execute(params![conversation_id.to_string(), message.role.as_str(), message.content])?;
        }
        Ok(())
    }

    // --- Conversation Operations ---

    /// Creates a conversation and its opening messages atomically.
    pub fn create_conversation(
        conn: &Connection,
        owner_id: &str,
        title: &str,
        messages: &[Message],
    ) -> DbResult<Conversation> {
        let id = Uuid::new_v4();

        Self::in_transaction(conn, |conn| {
            conn.execute(
                "INSERT INTO conversations (id, owner_id, title) VALUES (?, ?, ?)",
                params![id.to_string(), owner_id, title],
            )?;
            Self::insert_messages(conn, id, messages)
        })?;

        Self::get_conversation(conn, id)?.ok_or(duckdb::Error::QueryReturnedNoRows)
    }

    /// Appends messages and refreshes `updated_at`. Pairs land contiguously
    /// because the whole append runs in one transaction under the pool lock.
    ///
    /// Returns `false` without writing anything when the conversation no
    /// longer exists.
    pub fn append_messages(conn: &Connection, conversation_id: Uuid, messages: &[Message]) -> DbResult<bool> {
        Self::in_transaction(conn, |conn| {
            let touched = conn.execute(
                "UPDATE conversations SET updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                params![conversation_id.to_string()],
            )?;
            if touched != 1 {
                return Ok(false);
            }
            Self::insert_messages(conn, conversation_id, messages)?;
            Ok(true)
        })
    }

    pub fn get_conversation(conn: &Connection, id: Uuid) -> DbResult<Option<Conversation>> {
        let sql = format!("SELECT {} FROM conversations c WHERE c.id = ?", CONVERSATION_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_conversation)?;

        rows.next().transpose()
    }

    /// Looks a conversation up on behalf of `owner_id`. Conversations owned
    /// by anyone else are reported as absent.
    pub fn get_owned_conversation(conn: &Connection, id: Uuid, owner_id: &str) -> DbResult<Option<Conversation>> {
        let sql = format!(
            "SELECT {} FROM conversations c WHERE c.id = ? AND c.owner_id = ?",
            CONVERSATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id.to_string(), owner_id], Self::row_to_conversation)?;

        rows.next().transpose()
    }

    pub fn get_conversation_detail(conn: &Connection, id: Uuid, owner_id: &str) -> DbResult<Option<ConversationDetail>> {
        let conversation = match Self::get_owned_conversation(conn, id, owner_id)? {
            Some(c) => c,
            None => return Ok(None),
        };
        let messages = Self::get_messages(conn, id, usize::MAX, 0)?;

        Ok(Some(ConversationDetail { conversation, messages }))
    }

    pub fn list_conversations(
        conn: &Connection,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> DbResult<Vec<ConversationSummary>> {
        let sql = format!(
            "SELECT {}, (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) \
             FROM conversations c WHERE c.owner_id = ? \
             ORDER BY c.updated_at DESC, c.created_at DESC LIMIT ? OFFSET ?",
            CONVERSATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![owner_id, clamp_i64(limit), clamp_i64(offset)],
            Self::row_to_summary,
        )?;

        rows.collect()
    }

    pub fn count_conversations(conn: &Connection) -> DbResult<i64> {
        conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
    }

    pub fn delete_conversation(conn: &Connection, id: Uuid) -> DbResult<()> {
        let id_str = id.to_string();

        Self::in_transaction(conn, |conn| {
            conn.execute("DELETE FROM messages WHERE conversation_id = ?", params![id_str])?;
            conn.execute("DELETE FROM conversations WHERE id = ?", params![id_str])?;
            Ok(())
        })
    }

    // --- Message Operations ---

    pub fn get_messages(conn: &Connection, conversation_id: Uuid, limit: usize, offset: usize) -> DbResult<Vec<StoredMessage>> {
        let sql = format!(
            "SELECT {} FROM messages WHERE conversation_id = ? ORDER BY id ASC LIMIT ? OFFSET ?",
            MESSAGE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![conversation_id.to_string(), clamp_i64(limit), clamp_i64(offset)],
            Self::row_to_message,
        )?;

        rows.collect()
    }

    /// The last `limit` messages, oldest first.
    pub fn recent_messages(conn: &Connection, conversation_id: Uuid, limit: usize) -> DbResult<Vec<StoredMessage>> {
        let sql = format!(
            "SELECT * FROM (SELECT {} FROM messages WHERE conversation_id = ? ORDER BY id DESC LIMIT ?) \
             ORDER BY 1 ASC",
            MESSAGE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![conversation_id.to_string(), clamp_i64(limit)],
            Self::row_to_message,
        )?;

        rows.collect()
    }

    // --- Entry Operations ---

    pub fn insert_entry(conn: &Connection, entry: &NewEntry) -> DbResult<Entry> {
        let id = Uuid::new_v4();

        conn.execute(
            "INSERT INTO entries (id, owner_id, title, description, cultural_context, category, country, published) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id.to_string(),
                entry.owner_id,
                entry.title,
                entry.description,
                entry.cultural_context,
                entry.category.as_str(),
                entry.country,
                entry.published,
            ],
        )?;

        Self::get_entry(conn, id)?.ok_or(duckdb::Error::QueryReturnedNoRows)
    }

    pub fn get_entry(conn: &Connection, id: Uuid) -> DbResult<Option<Entry>> {
        let sql = format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_entry)?;

        rows.next().transpose()
    }

    pub fn list_entries(conn: &Connection, owner_id: &str) -> DbResult<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM entries WHERE owner_id = ? ORDER BY updated_at DESC, id",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id], Self::row_to_entry)?;

        rows.collect()
    }

    /// The owner's own published entries, most recently updated first.
    pub fn list_published_entries(conn: &Connection, owner_id: &str, limit: usize) -> DbResult<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM entries WHERE owner_id = ? AND published \
             ORDER BY updated_at DESC, id LIMIT ?",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id, clamp_i64(limit)], Self::row_to_entry)?;

        rows.collect()
    }
}

// DuckDB rejects LIMIT/OFFSET values above 2^62.
const MAX_LIMIT: i64 = 1 << 62;

fn clamp_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(MAX_LIMIT).min(MAX_LIMIT)
}
