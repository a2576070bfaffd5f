//! Schema version tracking.
//!
//! Each database file stamps its schema version into `schema_meta` at
//! initialization. [`run_migrations`] is the hook for forward-only
//! migrations; the baseline schema is version 1 and no later migrations
//! exist yet, so today it only rejects files written by a newer build.

use anyhow::{bail, Result};
use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Get the stored embedding model identifier, if any (vector database only).
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    match conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set the stored embedding model identifier (vector database only).
pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [model],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "database schema version {version} is newer than this build supports \
             (expected <= {CURRENT_SCHEMA_VERSION})"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_chat_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn fresh_db_is_at_current_version() {
        let conn = test_db();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn run_migrations_accepts_current_version() {
        let conn = test_db();
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn run_migrations_rejects_newer_schema() {
        let conn = test_db();
        conn.execute(
            "UPDATE schema_meta SET value = '99' WHERE key = 'schema_version'",
            [],
        )
        .unwrap();
        assert!(run_migrations(&conn).is_err());
    }

    #[test]
    fn embedding_model_round_trip() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_vector_schema(&conn).unwrap();

        assert!(get_embedding_model(&conn).unwrap().is_none());
        set_embedding_model(&conn, "all-MiniLM-L6-v2").unwrap();
        assert_eq!(
            get_embedding_model(&conn).unwrap().as_deref(),
            Some("all-MiniLM-L6-v2")
        );
    }
}
