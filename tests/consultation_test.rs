mod helpers;

use healthchat::consult::store::{self, DEFAULT_PENDING_LIMIT};
use healthchat::consult::types::ReviewStatus;
use healthchat::error::ApiError;
use helpers::{chat_db, insert_consultation};

#[test]
fn create_then_get_returns_pending_record_with_matching_fields() {
    let mut conn = chat_db();

    let created = store::create_consultation(
        &mut conn,
        "User_7",
        "I have a fever and cough",
        "Rest and drink fluids",
    )
    .unwrap();

    let fetched = store::get_consultation(&conn, &created.id).unwrap();
    assert_eq!(fetched.status, ReviewStatus::Pending);
    assert_eq!(fetched.patient_label, "User_7");
    assert_eq!(fetched.symptoms, "I have a fever and cough");
    assert_eq!(fetched.recommendation, "Rest and drink fluids");
    assert!(!fetched.created_at.is_empty());
    assert!(!fetched.updated_at.is_empty());
    assert!(fetched.doctor_name.is_none());
    assert!(fetched.doctor_note.is_none());
}

#[test]
fn ids_are_opaque_and_unique() {
    let mut conn = chat_db();

    let a = insert_consultation(&mut conn, "User_1");
    let b = insert_consultation(&mut conn, "User_2");
    assert_ne!(a.id, b.id);
    // UUID text form: random, fixed-width, not enumerable
    assert_eq!(a.id.len(), 36);
    assert!(a.id.chars().enumerate().all(|(i, c)| match i {
        8 | 13 | 18 | 23 => c == '-',
        _ => c.is_ascii_hexdigit(),
    }));
}

#[test]
fn list_pending_orders_newest_first() {
    let mut conn = chat_db();

    let first = insert_consultation(&mut conn, "User_1");
    let second = insert_consultation(&mut conn, "User_2");
    let third = insert_consultation(&mut conn, "User_3");

    let listed = store::list_pending(&conn, DEFAULT_PENDING_LIMIT).unwrap();
    let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]);
}

#[test]
fn list_pending_applies_the_limit() {
    let mut conn = chat_db();
    for i in 0..10 {
        insert_consultation(&mut conn, &format!("User_{i}"));
    }

    assert_eq!(store::list_pending(&conn, 4).unwrap().len(), 4);
    assert_eq!(store::list_pending(&conn, DEFAULT_PENDING_LIMIT).unwrap().len(), 10);
}

#[test]
fn unknown_id_is_not_found() {
    let conn = chat_db();
    let err = store::get_consultation(&conn, "4b825dc6-42ce-4c2b-a1ce-000000000000").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
