//! The review state machine.
//!
//! `pending` is the only state that transitions: `approve` moves it to
//! `approved`, `modify` to `modified`, and both are terminal. The checks run
//! in a fixed order — action/input validation first, then the state check —
//! so a malformed request is reported the same way whether or not the target
//! consultation is already settled. Key verification happens before any of
//! this, at the HTTP layer.

use crate::error::{ApiError, ApiResult};

use super::types::{ReviewAction, ReviewStatus};

/// A validated review request, ready to apply to a pending consultation.
#[derive(Debug, Clone)]
pub struct ReviewDecision {
    pub action: ReviewAction,
    pub next_status: ReviewStatus,
    /// Present exactly when the action is `modify`.
    pub doctor_note: Option<String>,
}

/// Validate the action token, doctor name, and note requirement.
///
/// Runs before any consultation state is read. `modify` demands a non-empty
/// note; `approve` ignores any note supplied.
pub fn decide(action: &str, doctor_name: &str, doctor_note: Option<&str>) -> ApiResult<ReviewDecision> {
    let action: ReviewAction = action
        .parse()
        .map_err(|_| ApiError::Validation("invalid action".into()))?;

    if doctor_name.trim().is_empty() {
        return Err(ApiError::Validation("doctor name required".into()));
    }

    let doctor_note = match action {
        ReviewAction::Approve => None,
        ReviewAction::Modify => {
            let note = doctor_note.map(str::trim).unwrap_or("");
            if note.is_empty() {
                return Err(ApiError::Validation("doctor note required".into()));
            }
            Some(note.to_string())
        }
    };

    Ok(ReviewDecision {
        action,
        next_status: action.target_status(),
        doctor_note,
    })
}

/// Reject transitions out of a terminal state.
///
/// Re-reviewing an approved or modified consultation is a conflict, never a
/// silent overwrite.
pub fn ensure_reviewable(current: ReviewStatus) -> ApiResult<()> {
    if current.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "consultation already {current}"
        )));
    }
    Ok(())
}
