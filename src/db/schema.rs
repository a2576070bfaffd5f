//! SQL DDL for both database files.
//!
//! The chat database holds `consultations`, `doctors`, `users`, and
//! `schema_meta`. The vector database holds `entries`, `schema_meta`, and one
//! `vec0` virtual table per collection. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::Connection;

/// Schema DDL for the chat database.
const CHAT_SCHEMA_SQL: &str = r#"
-- Advisory exchanges awaiting or having completed doctor review
CREATE TABLE IF NOT EXISTS consultations (
    id TEXT PRIMARY KEY,
    patient_label TEXT NOT NULL,
    symptoms TEXT NOT NULL,
    recommendation TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending','approved','modified')),
    doctor_name TEXT,
    doctor_note TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_consultations_status_created
    ON consultations(status, created_at);

-- Review credentials; one bootstrap row is provisioned from config
CREATE TABLE IF NOT EXISTS doctors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    access_key TEXT UNIQUE NOT NULL,
    created_at TEXT NOT NULL
);

-- Optional login registry, uncoupled from the consultation flow
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Schema DDL for the vector database (documents + metadata side).
const VECTOR_SCHEMA_SQL: &str = r#"
-- Raw documents and metadata; embeddings live in the vec0 tables
CREATE TABLE IF NOT EXISTS entries (
    id TEXT NOT NULL,
    collection TEXT NOT NULL CHECK(collection IN ('knowledge_base','conversations','user_profiles')),
    document TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// vec0 virtual tables must be created separately (sqlite-vec syntax).
/// One KNN index per collection.
const VECTOR_VEC_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS vec_knowledge_base USING vec0(
    id TEXT PRIMARY KEY,
    embedding FLOAT[384]
);
CREATE VIRTUAL TABLE IF NOT EXISTS vec_conversations USING vec0(
    id TEXT PRIMARY KEY,
    embedding FLOAT[384]
);
CREATE VIRTUAL TABLE IF NOT EXISTS vec_user_profiles USING vec0(
    id TEXT PRIMARY KEY,
    embedding FLOAT[384]
);
"#;

/// Initialize the chat database schema. Idempotent (uses IF NOT EXISTS).
pub fn init_chat_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CHAT_SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;
    Ok(())
}

/// Initialize the vector database schema. Idempotent (uses IF NOT EXISTS).
pub fn init_vector_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(VECTOR_SCHEMA_SQL)?;
    conn.execute_batch(VECTOR_VEC_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;
    Ok(())
}
