//! Consultation record types and the review-state vocabulary.
//!
//! Defines [`ReviewStatus`] (the consultation lifecycle states),
//! [`ReviewAction`] (the two doctor review verbs), and [`Consultation`]
//! (a full record as persisted in the `consultations` table).

use serde::{Deserialize, Serialize};

/// Lifecycle state of a consultation.
///
/// Every record is created `pending` and moves to exactly one of the two
/// terminal states through the review workflow. Terminal states never
/// transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Awaiting doctor review.
    Pending,
    /// Accepted as-is by a doctor. Terminal.
    Approved,
    /// Annotated with a doctor note. Terminal.
    Modified,
}

impl ReviewStatus {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Modified => "modified",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Modified)
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "modified" => Ok(Self::Modified),
            _ => Err(format!("unknown review status: {s}")),
        }
    }
}

/// A doctor's review verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Accept the recommendation as-is.
    Approve,
    /// Replace or annotate the recommendation; requires a doctor note.
    Modify,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Modify => "modify",
        }
    }

    /// The terminal status this action produces.
    pub fn target_status(&self) -> ReviewStatus {
        match self {
            Self::Approve => ReviewStatus::Approved,
            Self::Modify => ReviewStatus::Modified,
        }
    }
}

impl std::fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "modify" => Ok(Self::Modify),
            _ => Err(format!("unknown review action: {s}")),
        }
    }
}

/// A consultation record, matching the `consultations` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    /// Opaque, cryptographically random id (UUID v4). Never sequential.
    pub id: String,
    /// Display name or anonymized tag of the patient. Immutable.
    pub patient_label: String,
    /// The symptom message exactly as submitted. Immutable.
    pub symptoms: String,
    /// The advisory produced at creation time. Immutable.
    pub recommendation: String,
    /// Lifecycle state; the only field the system mutates.
    pub status: ReviewStatus,
    /// Reviewing doctor's name, set on any review transition.
    pub doctor_name: Option<String>,
    /// Doctor's note; populated if and only if status is `modified`.
    pub doctor_note: Option<String>,
    /// RFC 3339 creation timestamp, fixed at insert.
    pub created_at: String,
    /// RFC 3339 timestamp, refreshed on every status transition.
    pub updated_at: String,
}
