pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

use crate::config::DoctorConfig;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open a connection with the standard pragmas applied, no schema work.
///
/// This is the per-request path: every inbound request opens its own
/// connection and closes it before returning.
pub fn connect(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    load_sqlite_vec();
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

/// Open (or create) the chat database at the given path with schema
/// initialized and migrations applied. Called once at process start.
pub fn open_chat_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let conn = connect(path)?;
    schema::init_chat_schema(&conn).context("failed to initialize chat schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "chat database initialized");
    Ok(conn)
}

/// Open (or create) the vector database at the given path with schema
/// initialized and the embedding model identifier stamped.
pub fn open_vector_database(path: impl AsRef<Path>, embedding_model: &str) -> Result<Connection> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let conn = connect(path)?;
    schema::init_vector_schema(&conn).context("failed to initialize vector schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    // Warn if the configured embedding model no longer matches the one the
    // index was built with — existing vectors would need re-embedding.
    match migrations::get_embedding_model(&conn)? {
        Some(stored) if stored != embedding_model => {
            tracing::warn!(
                stored = %stored,
                configured = %embedding_model,
                "embedding model changed — existing vectors were built with a different model"
            );
        }
        Some(_) => {}
        None => migrations::set_embedding_model(&conn, embedding_model)?,
    }

    tracing::info!(path = %path.display(), "vector database initialized");
    Ok(conn)
}

/// Insert the bootstrap doctor record if the doctors table is empty.
///
/// The access key is the shared review secret from configuration; any holder
/// of it may review any consultation.
pub fn bootstrap_doctor(conn: &Connection, doctor: &DoctorConfig) -> Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?;
    if count == 0 {
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO doctors (name, email, access_key, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![doctor.name, doctor.email, doctor.access_key, now],
        )?;
        tracing::info!(name = %doctor.name, "bootstrap doctor provisioned");
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_doctor_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        schema::init_chat_schema(&conn).unwrap();

        let doctor = DoctorConfig::default();
        bootstrap_doctor(&conn, &doctor).unwrap();
        bootstrap_doctor(&conn, &doctor).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let (name, key): (String, String) = conn
            .query_row("SELECT name, access_key FROM doctors", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(name, doctor.name);
        assert_eq!(key, doctor.access_key);
    }
}
