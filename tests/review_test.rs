mod helpers;

use healthchat::consult::auth::verify_access_key;
use healthchat::consult::store;
use healthchat::consult::types::ReviewStatus;
use healthchat::error::ApiError;
use helpers::{chat_db, insert_consultation};

#[test]
fn approve_transitions_to_approved_with_name_and_no_note() {
    let mut conn = chat_db();
    let c = insert_consultation(&mut conn, "User_1");

    let reviewed = store::apply_review(&mut conn, &c.id, "approve", "Dr. Lee", None).unwrap();
    assert_eq!(reviewed.status, ReviewStatus::Approved);
    assert_eq!(reviewed.doctor_name.as_deref(), Some("Dr. Lee"));
    assert!(reviewed.doctor_note.is_none());
}

#[test]
fn approve_refreshes_updated_at_only() {
    let mut conn = chat_db();
    let c = insert_consultation(&mut conn, "User_1");

    std::thread::sleep(std::time::Duration::from_millis(5));
    let reviewed = store::apply_review(&mut conn, &c.id, "approve", "Dr. Lee", None).unwrap();
    assert_eq!(reviewed.created_at, c.created_at);
    assert!(reviewed.updated_at > c.updated_at);
    // the advisory content never changes on review
    assert_eq!(reviewed.symptoms, c.symptoms);
    assert_eq!(reviewed.recommendation, c.recommendation);
}

#[test]
fn modify_without_note_fails_and_leaves_record_unchanged() {
    let mut conn = chat_db();
    let c = insert_consultation(&mut conn, "User_1");

    for note in [None, Some(""), Some("   ")] {
        let err = store::apply_review(&mut conn, &c.id, "modify", "Dr. Lee", note).unwrap_err();
        assert_eq!(err.to_string(), "doctor note required");
    }

    let unchanged = store::get_consultation(&conn, &c.id).unwrap();
    assert_eq!(unchanged.status, ReviewStatus::Pending);
    assert!(unchanged.doctor_name.is_none());
    assert!(unchanged.doctor_note.is_none());
    assert_eq!(unchanged.updated_at, c.updated_at);
}

#[test]
fn modify_with_note_transitions_to_modified() {
    let mut conn = chat_db();
    let c = insert_consultation(&mut conn, "User_1");

    let reviewed = store::apply_review(
        &mut conn,
        &c.id,
        "modify",
        "Dr. Gupta",
        Some("also check hydration"),
    )
    .unwrap();
    assert_eq!(reviewed.status, ReviewStatus::Modified);
    assert_eq!(reviewed.doctor_name.as_deref(), Some("Dr. Gupta"));
    assert_eq!(reviewed.doctor_note.as_deref(), Some("also check hydration"));
}

#[test]
fn invalid_action_is_rejected() {
    let mut conn = chat_db();
    let c = insert_consultation(&mut conn, "User_1");

    let err = store::apply_review(&mut conn, &c.id, "escalate", "Dr. Lee", None).unwrap_err();
    assert_eq!(err.to_string(), "invalid action");
    assert!(matches!(err, ApiError::Validation(_)));
}

#[test]
fn terminal_consultations_reject_any_further_review() {
    let mut conn = chat_db();

    let approved = insert_consultation(&mut conn, "User_1");
    store::apply_review(&mut conn, &approved.id, "approve", "Dr. Lee", None).unwrap();

    let modified = insert_consultation(&mut conn, "User_2");
    store::apply_review(&mut conn, &modified.id, "modify", "Dr. Lee", Some("note")).unwrap();

    for id in [&approved.id, &modified.id] {
        let err = store::apply_review(&mut conn, id, "approve", "Dr. Gupta", None).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    // No mixed state: the first decision stands untouched
    let record = store::get_consultation(&conn, &approved.id).unwrap();
    assert_eq!(record.status, ReviewStatus::Approved);
    assert_eq!(record.doctor_name.as_deref(), Some("Dr. Lee"));
    assert!(record.doctor_note.is_none());
}

#[test]
fn review_of_unknown_id_is_not_found() {
    let mut conn = chat_db();
    let err = store::apply_review(&mut conn, "missing-id", "approve", "Dr. Lee", None).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn access_key_is_checked_before_anything_else() {
    let conn = chat_db();

    // The provisioned bootstrap key passes
    verify_access_key(&conn, Some("doctor123")).unwrap();

    // Wrong, empty, and missing keys all fail with an auth error, regardless
    // of whether the consultation in question exists
    for presented in [Some("wrong-key"), Some(""), None] {
        let err = verify_access_key(&conn, presented).unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }
}

#[test]
fn reviews_of_different_consultations_are_independent() {
    let mut conn = chat_db();
    let a = insert_consultation(&mut conn, "User_1");
    let b = insert_consultation(&mut conn, "User_2");

    store::apply_review(&mut conn, &a.id, "approve", "Dr. Lee", None).unwrap();

    let b_after = store::get_consultation(&conn, &b.id).unwrap();
    assert_eq!(b_after.status, ReviewStatus::Pending);

    store::apply_review(&mut conn, &b.id, "modify", "Dr. Gupta", Some("note")).unwrap();
    let a_after = store::get_consultation(&conn, &a.id).unwrap();
    assert_eq!(a_after.status, ReviewStatus::Approved);
}
