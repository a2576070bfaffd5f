//! User registration and login.
//!
//! A minimal registry used only for optional login on the chat front end —
//! nothing in the consultation flow depends on it. Passwords are stored as a
//! one-way SHA-256 hash; login returns a profile, never a credential, and
//! there is no session or token issuance.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{ApiError, ApiResult};

/// A user profile as returned by [`login`]. The password hash never leaves
/// this module.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Register a new user, returning the assigned id.
///
/// The email-existence check and the insert run in one immediate transaction
/// so two concurrent registrations of the same email serialize; the UNIQUE
/// column constraint backstops anything that still slips through.
pub fn register(
    conn: &mut Connection,
    name: &str,
    email: &str,
    password: &str,
) -> ApiResult<i64> {
    if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "name, email, and password required".into(),
        ));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let now = Utc::now().to_rfc3339();
    let inserted = tx.execute(
        "INSERT INTO users (name, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![name, email, hash_password(password), now],
    );
    match inserted {
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Err(ApiError::Conflict("email already registered".into()));
        }
        other => {
            other?;
        }
    }

    let user_id = tx.last_insert_rowid();
    tx.commit()?;

    tracing::info!(user_id, "user registered");
    Ok(user_id)
}

/// Authenticate by email and password.
///
/// Unknown email and wrong password produce the identical generic error so
/// the response does not reveal which part failed.
pub fn login(conn: &Connection, email: &str, password: &str) -> ApiResult<Account> {
    let row: Option<(i64, String, String, String)> = conn
        .query_row(
            "SELECT id, name, email, password_hash FROM users WHERE email = ?1",
            params![email],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    match row {
        Some((id, name, email, stored_hash)) if stored_hash == hash_password(password) => {
            Ok(Account { id, name, email })
        }
        _ => Err(ApiError::Auth("invalid credentials".into())),
    }
}

/// Lower-hex SHA-256 of the plaintext.
fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
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
    fn register_then_login() {
        let mut conn = test_db();

        let id = register(&mut conn, "Asha", "asha@example.com", "hunter2").unwrap();
        assert!(id > 0);

        let account = login(&conn, "asha@example.com", "hunter2").unwrap();
        assert_eq!(account.id, id);
        assert_eq!(account.name, "Asha");
        assert_eq!(account.email, "asha@example.com");
    }

    #[test]
    fn duplicate_email_conflicts() {
        let mut conn = test_db();

        register(&mut conn, "Asha", "asha@example.com", "hunter2").unwrap();
        let err = register(&mut conn, "Other", "asha@example.com", "different").unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn bad_password_and_unknown_email_are_indistinguishable() {
        let mut conn = test_db();
        register(&mut conn, "Asha", "asha@example.com", "hunter2").unwrap();

        let wrong_password = login(&conn, "asha@example.com", "nope").unwrap_err();
        let unknown_email = login(&conn, "ghost@example.com", "hunter2").unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.to_string(), "invalid credentials");
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut conn = test_db();
        let err = register(&mut conn, "", "a@example.com", "pw").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = register(&mut conn, "Asha", "a@example.com", "").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn password_is_stored_hashed() {
        let mut conn = test_db();
        register(&mut conn, "Asha", "asha@example.com", "hunter2").unwrap();

        let stored: String = conn
            .query_row("SELECT password_hash FROM users", [], |row| row.get(0))
            .unwrap();
        assert_ne!(stored, "hunter2");
        assert_eq!(stored.len(), 64);
        assert_eq!(stored, hash_password("hunter2"));
    }
}
