#![allow(dead_code)]

use healthchat::config::DoctorConfig;
use healthchat::consult::store;
use healthchat::consult::types::Consultation;
use healthchat::db;
use healthchat::embedding::EMBEDDING_DIM;
use rusqlite::Connection;

/// Open a fresh in-memory chat database with the bootstrap doctor provisioned
/// (access key `doctor123`).
pub fn chat_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::schema::init_chat_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    db::bootstrap_doctor(&conn, &DoctorConfig::default()).unwrap();
    conn
}

/// Open a fresh in-memory vector database with all collections initialized.
pub fn vector_db() -> Connection {
    db::load_sqlite_vec();
    let conn = Connection::open_in_memory().unwrap();
    db::schema::init_vector_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Deterministic 384-dim unit vector with a spike at position `seed`.
/// Distinct seeds produce orthogonal vectors.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed % EMBEDDING_DIM] = 1.0;
    v
}

/// A unit vector with high cosine similarity to `test_embedding(seed)`.
pub fn similar_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed % EMBEDDING_DIM] = 0.95;
    v[(seed + 1) % EMBEDDING_DIM] = 0.3122;
    v
}

/// Insert a pending consultation and return it.
pub fn insert_consultation(conn: &mut Connection, patient_label: &str) -> Consultation {
    store::create_consultation(
        conn,
        patient_label,
        "I have a fever and cough",
        "Rest and drink fluids",
    )
    .unwrap()
}
