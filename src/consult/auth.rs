//! Doctor access-key verification.
//!
//! Review operations are gated by a shared static secret. The key only
//! proves *that* the caller holds it, not which doctor is acting — the
//! reviewer identity in the record comes from the request body. Comparison
//! is constant-time to avoid leaking key prefixes through timing.

use rusqlite::Connection;
use subtle::ConstantTimeEq;

use crate::error::{ApiError, ApiResult};

/// Check a presented access key against every provisioned doctor key.
///
/// Runs before any consultation state is inspected. Absent or empty keys are
/// rejected without touching the database beyond the key listing.
pub fn verify_access_key(conn: &Connection, presented: Option<&str>) -> ApiResult<()> {
    let presented = match presented {
        Some(key) if !key.is_empty() => key,
        _ => return Err(ApiError::Auth("doctor access key required".into())),
    };

    let mut stmt = conn.prepare("SELECT access_key FROM doctors")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if keys.iter().any(|key| constant_time_eq(key, presented)) {
        Ok(())
    } else {
        Err(ApiError::Auth("invalid doctor access key".into()))
    }
}

/// Constant-time string equality. Length mismatches return false immediately;
/// the length of the shared key is not considered secret.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DoctorConfig;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_chat_schema(&conn).unwrap();
        crate::db::bootstrap_doctor(&conn, &DoctorConfig::default()).unwrap();
        conn
    }

    #[test]
    fn provisioned_key_is_accepted() {
        let conn = test_db();
        verify_access_key(&conn, Some("doctor123")).unwrap();
    }

    #[test]
    fn wrong_key_is_rejected() {
        let conn = test_db();
        let err = verify_access_key(&conn, Some("doctor124")).unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
        assert_eq!(err.to_string(), "invalid doctor access key");
    }

    #[test]
    fn missing_or_empty_key_is_rejected() {
        let conn = test_db();
        let err = verify_access_key(&conn, None).unwrap_err();
        assert_eq!(err.to_string(), "doctor access key required");

        let err = verify_access_key(&conn, Some("")).unwrap_err();
        assert_eq!(err.to_string(), "doctor access key required");
    }

    #[test]
    fn constant_time_eq_handles_length_mismatch() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(!constant_time_eq("", "a"));
    }
}
