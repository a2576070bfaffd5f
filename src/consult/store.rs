//! Consultation persistence — creation, lookup, and review application.
//!
//! [`create_consultation`] and [`apply_review`] are the only write paths, and
//! both run inside a transaction: a failed creation leaves no row behind, and
//! a review reads, validates, and writes the status as one atomic unit so two
//! concurrent reviews of the same id can never interleave field writes.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::error::{ApiError, ApiResult};

use super::review;
use super::types::{Consultation, ReviewAction, ReviewStatus};

/// Default page size for [`list_pending`].
pub const DEFAULT_PENDING_LIMIT: usize = 50;

const CONSULTATION_COLUMNS: &str =
    "id, patient_label, symptoms, recommendation, status, doctor_name, doctor_note, created_at, updated_at";

/// Insert a new consultation with a fresh random id and `pending` status,
/// returning the persisted record.
pub fn create_consultation(
    conn: &mut Connection,
    patient_label: &str,
    symptoms: &str,
    recommendation: &str,
) -> ApiResult<Consultation> {
    let tx = conn.transaction()?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    tx.execute(
        "INSERT INTO consultations (id, patient_label, symptoms, recommendation, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
        params![id, patient_label, symptoms, recommendation, now],
    )?;

    let record = fetch_required(&tx, &id)?;
    tx.commit()?;

    tracing::info!(id = %record.id, "consultation created");
    Ok(record)
}

/// Look up a consultation by id.
pub fn get_consultation(conn: &Connection, id: &str) -> ApiResult<Consultation> {
    fetch_optional(conn, id)?.ok_or_else(|| ApiError::NotFound("consultation not found".into()))
}

/// Pending consultations, newest first, truncated to `limit`.
pub fn list_pending(conn: &Connection, limit: usize) -> ApiResult<Vec<Consultation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONSULTATION_COLUMNS} FROM consultations \
         WHERE status = 'pending' ORDER BY created_at DESC, rowid DESC LIMIT ?1"
    ))?;

    let records = stmt
        .query_map(params![limit as i64], row_to_consultation)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Apply a doctor review to a pending consultation.
///
/// Validation (action token, doctor name, note requirement) runs before any
/// state is read. The read-validate-write then runs under an immediate
/// transaction, which takes the write lock up front; a concurrent review of
/// the same id serializes behind it and sees the terminal state.
pub fn apply_review(
    conn: &mut Connection,
    id: &str,
    action: &str,
    doctor_name: &str,
    doctor_note: Option<&str>,
) -> ApiResult<Consultation> {
    let decision = review::decide(action, doctor_name, doctor_note)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current: ReviewStatus = tx
        .query_row(
            "SELECT status FROM consultations WHERE id = ?1",
            params![id],
            |row| parse_status(row, 0),
        )
        .optional()?
        .ok_or_else(|| ApiError::NotFound("consultation not found".into()))?;

    review::ensure_reviewable(current)?;

    let now = Utc::now().to_rfc3339();
    match decision.action {
        ReviewAction::Approve => {
            tx.execute(
                "UPDATE consultations SET status = ?1, doctor_name = ?2, updated_at = ?3 WHERE id = ?4",
                params![decision.next_status.as_str(), doctor_name, now, id],
            )?;
        }
        ReviewAction::Modify => {
            tx.execute(
                "UPDATE consultations SET status = ?1, doctor_name = ?2, doctor_note = ?3, updated_at = ?4 WHERE id = ?5",
                params![
                    decision.next_status.as_str(),
                    doctor_name,
                    decision.doctor_note,
                    now,
                    id
                ],
            )?;
        }
    }

    let record = fetch_required(&tx, id)?;
    tx.commit()?;

    tracing::info!(id = %record.id, action = %decision.action, "consultation reviewed");
    Ok(record)
}

fn fetch_optional(conn: &Connection, id: &str) -> ApiResult<Option<Consultation>> {
    let record = conn
        .query_row(
            &format!("SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE id = ?1"),
            params![id],
            row_to_consultation,
        )
        .optional()?;
    Ok(record)
}

/// Fetch a row that is known to exist (just written in this transaction).
fn fetch_required(conn: &Connection, id: &str) -> ApiResult<Consultation> {
    let record = conn.query_row(
        &format!("SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE id = ?1"),
        params![id],
        row_to_consultation,
    )?;
    Ok(record)
}

fn row_to_consultation(row: &Row<'_>) -> rusqlite::Result<Consultation> {
    Ok(Consultation {
        id: row.get(0)?,
        patient_label: row.get(1)?,
        symptoms: row.get(2)?,
        recommendation: row.get(3)?,
        status: parse_status(row, 4)?,
        doctor_name: row.get(5)?,
        doctor_note: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// The CHECK constraint keeps this total; a failure here means a corrupt row.
fn parse_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<ReviewStatus> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}
