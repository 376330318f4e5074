use crate::config::DatabaseConfig;
use duckdb::{Connection, Result as DbResult};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

pub type DbPool = Arc<Mutex<Connection>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

const SCHEMA: &str = r#"
CREATE SEQUENCE IF NOT EXISTS seq_messages_id;

CREATE TABLE IF NOT EXISTS conversations (
    id VARCHAR PRIMARY KEY,
    owner_id VARCHAR NOT NULL,
    title VARCHAR NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS messages (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_messages_id'),
    conversation_id VARCHAR NOT NULL,
    role VARCHAR NOT NULL,
    content TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, id);

CREATE TABLE IF NOT EXISTS entries (
    id VARCHAR PRIMARY KEY,
    owner_id VARCHAR NOT NULL,
    title VARCHAR NOT NULL,
    description TEXT NOT NULL,
    cultural_context TEXT,
    category VARCHAR NOT NULL,
    country VARCHAR,
    published BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_entries_owner ON entries(owner_id);
"#;

pub fn get_connection(config: &DatabaseConfig) -> DbResult<DbPool> {
    let conn = if config.path == ":memory:" {
        info!("Opening in-memory DuckDB database");
        Connection::open_in_memory()?
    } else {
        info!("Connecting to DuckDB at {}", config.path);
        Connection::open(&config.path)?
    };

    init_schema(&conn)?;

    Ok(Arc::new(Mutex::new(conn)))
}

/// Locks the shared connection. Callers must drop the guard before awaiting.
pub fn lock(pool: &DbPool) -> Result<MutexGuard<'_, Connection>, StoreError> {
    pool.lock().map_err(|_| StoreError::Poisoned)
}

fn init_schema(conn: &Connection) -> DbResult<()> {
    info!("Initializing database schema");
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
