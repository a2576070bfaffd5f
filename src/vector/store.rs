//! Vector collection persistence.
//!
//! Every write touches two tables — the `entries` row and the collection's
//! vec0 index — inside one transaction, so a failed write never leaves a
//! document without its embedding or vice versa.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{ApiError, ApiResult};

use super::types::{Collection, SearchHit, VectorEntry};
use super::{embedding_to_bytes, l2_to_cosine_distance};

/// A document ready for insertion, embedding already computed.
#[derive(Debug)]
pub struct NewEntry {
    pub document: String,
    pub metadata: Option<serde_json::Value>,
    pub embedding: Vec<f32>,
}

/// Insert a document under a fresh random id, returning the stored entry.
pub fn add_entry(
    conn: &mut Connection,
    collection: Collection,
    entry: NewEntry,
) -> ApiResult<VectorEntry> {
    let id = uuid::Uuid::new_v4().to_string();
    let tx = conn.transaction()?;
    insert_in_tx(&tx, collection, &id, &entry)?;
    let stored = fetch_entry(&tx, collection, &id)?
        .ok_or_else(|| ApiError::NotFound("entry not found".into()))?;
    tx.commit()?;
    Ok(stored)
}

/// Insert many documents in one transaction, returning the assigned ids.
pub fn batch_add(
    conn: &mut Connection,
    collection: Collection,
    entries: &[NewEntry],
) -> ApiResult<Vec<String>> {
    let tx = conn.transaction()?;
    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = uuid::Uuid::new_v4().to_string();
        insert_in_tx(&tx, collection, &id, entry)?;
        ids.push(id);
    }
    tx.commit()?;
    Ok(ids)
}

/// Insert or replace a document under a caller-chosen id.
///
/// Used for conversations, which are keyed by their conversation id and
/// re-saved as they grow.
pub fn upsert_entry(
    conn: &mut Connection,
    collection: Collection,
    id: &str,
    entry: NewEntry,
) -> ApiResult<()> {
    let tx = conn.transaction()?;
    if fetch_entry(&tx, collection, id)?.is_some() {
        rewrite_in_tx(&tx, collection, id, &entry)?;
    } else {
        insert_in_tx(&tx, collection, id, &entry)?;
    }
    tx.commit()?;
    Ok(())
}

/// Re-embed and rewrite an existing document. Unknown ids are an error.
pub fn update_entry(
    conn: &mut Connection,
    collection: Collection,
    id: &str,
    entry: NewEntry,
) -> ApiResult<()> {
    let tx = conn.transaction()?;
    if fetch_entry(&tx, collection, id)?.is_none() {
        return Err(ApiError::NotFound("entry not found".into()));
    }
    rewrite_in_tx(&tx, collection, id, &entry)?;
    tx.commit()?;
    Ok(())
}

/// Remove a document and its embedding. Deleting an absent id is a no-op.
pub fn delete_entry(conn: &mut Connection, collection: Collection, id: &str) -> ApiResult<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM entries WHERE collection = ?1 AND id = ?2",
        params![collection.as_str(), id],
    )?;
    tx.execute(
        &format!("DELETE FROM {} WHERE id = ?1", collection.vec_table()),
        params![id],
    )?;
    tx.commit()?;
    Ok(())
}

/// All entries of a collection in insertion order.
pub fn get_all(conn: &Connection, collection: Collection) -> ApiResult<Vec<VectorEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, document, metadata, created_at, updated_at FROM entries \
         WHERE collection = ?1 ORDER BY created_at, rowid",
    )?;
    let entries = stmt
        .query_map(params![collection.as_str()], row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// K nearest neighbors by cosine distance, nearest first.
pub fn search(
    conn: &Connection,
    collection: Collection,
    query_embedding: &[f32],
    k: usize,
) -> ApiResult<Vec<SearchHit>> {
    // vec0 KNN requires a literal LIMIT
    let mut stmt = conn.prepare(&format!(
        "SELECT id, distance FROM {} WHERE embedding MATCH ?1 ORDER BY distance LIMIT {k}",
        collection.vec_table()
    ))?;

    let neighbors: Vec<(String, f64)> = stmt
        .query_map(params![embedding_to_bytes(query_embedding)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut hits = Vec::with_capacity(neighbors.len());
    for (id, l2) in neighbors {
        // The entries row exists for every indexed id; skip if it was lost
        if let Some(entry) = fetch_entry(conn, collection, &id)? {
            hits.push(SearchHit {
                id: entry.id,
                document: entry.document,
                metadata: entry.metadata,
                distance: l2_to_cosine_distance(l2),
            });
        }
    }
    Ok(hits)
}

fn insert_in_tx(
    conn: &Connection,
    collection: Collection,
    id: &str,
    entry: &NewEntry,
) -> ApiResult<()> {
    let now = Utc::now().to_rfc3339();
    let metadata_json = entry
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| ApiError::Validation(format!("bad metadata: {e}")))?;

    conn.execute(
        "INSERT INTO entries (id, collection, document, metadata, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id, collection.as_str(), entry.document, metadata_json, now],
    )?;
    conn.execute(
        &format!(
            "INSERT INTO {} (id, embedding) VALUES (?1, ?2)",
            collection.vec_table()
        ),
        params![id, embedding_to_bytes(&entry.embedding)],
    )?;
    Ok(())
}

fn rewrite_in_tx(
    conn: &Connection,
    collection: Collection,
    id: &str,
    entry: &NewEntry,
) -> ApiResult<()> {
    let now = Utc::now().to_rfc3339();
    let metadata_json = entry
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| ApiError::Validation(format!("bad metadata: {e}")))?;

    conn.execute(
        "UPDATE entries SET document = ?1, metadata = ?2, updated_at = ?3 \
         WHERE collection = ?4 AND id = ?5",
        params![entry.document, metadata_json, now, collection.as_str(), id],
    )?;
    // vec0 rows are replaced, not updated in place
    conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1", collection.vec_table()),
        params![id],
    )?;
    conn.execute(
        &format!(
            "INSERT INTO {} (id, embedding) VALUES (?1, ?2)",
            collection.vec_table()
        ),
        params![id, embedding_to_bytes(&entry.embedding)],
    )?;
    Ok(())
}

fn fetch_entry(
    conn: &Connection,
    collection: Collection,
    id: &str,
) -> ApiResult<Option<VectorEntry>> {
    let entry = conn
        .query_row(
            "SELECT id, document, metadata, created_at, updated_at FROM entries \
             WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<VectorEntry> {
    let metadata_json: Option<String> = row.get(2)?;
    let metadata = metadata_json.and_then(|raw| serde_json::from_str(&raw).ok());
    Ok(VectorEntry {
        id: row.get(0)?,
        document: row.get(1)?,
        metadata,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EMBEDDING_DIM;

    fn test_db() -> Connection {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_vector_schema(&conn).unwrap();
        conn
    }

    /// Unit vector with a spike at `seed`; distinct seeds are orthogonal.
    fn spike(seed: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        v[seed % EMBEDDING_DIM] = 1.0;
        v
    }

    fn entry(document: &str, embedding: Vec<f32>) -> NewEntry {
        NewEntry {
            document: document.into(),
            metadata: None,
            embedding,
        }
    }

    #[test]
    fn add_then_get_all_round_trip() {
        let mut conn = test_db();

        let stored = add_entry(
            &mut conn,
            Collection::KnowledgeBase,
            NewEntry {
                document: "Wash hands often".into(),
                metadata: Some(serde_json::json!({"source": "who"})),
                embedding: spike(0),
            },
        )
        .unwrap();
        assert!(!stored.id.is_empty());
        assert_eq!(stored.document, "Wash hands often");
        assert_eq!(stored.metadata.unwrap()["source"], "who");

        let all = get_all(&conn, Collection::KnowledgeBase).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].document, "Wash hands often");
    }

    #[test]
    fn collections_are_independent() {
        let mut conn = test_db();
        add_entry(&mut conn, Collection::KnowledgeBase, entry("knowledge", spike(0))).unwrap();
        add_entry(&mut conn, Collection::Conversations, entry("chat", spike(1))).unwrap();

        assert_eq!(get_all(&conn, Collection::KnowledgeBase).unwrap().len(), 1);
        assert_eq!(get_all(&conn, Collection::Conversations).unwrap().len(), 1);
        assert_eq!(get_all(&conn, Collection::UserProfiles).unwrap().len(), 0);
    }

    #[test]
    fn search_ranks_nearest_first_with_cosine_distance() {
        let mut conn = test_db();
        let near = add_entry(&mut conn, Collection::KnowledgeBase, entry("near", spike(0))).unwrap();
        let far = add_entry(&mut conn, Collection::KnowledgeBase, entry("far", spike(7))).unwrap();

        let hits = search(&conn, Collection::KnowledgeBase, &spike(0), 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, near.id);
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[1].id, far.id);
        // orthogonal unit vectors sit at cosine distance 1
        assert!((hits[1].distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn search_respects_k() {
        let mut conn = test_db();
        for i in 0..5 {
            add_entry(&mut conn, Collection::KnowledgeBase, entry("doc", spike(i))).unwrap();
        }
        let hits = search(&conn, Collection::KnowledgeBase, &spike(0), 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn update_rewrites_document_and_embedding() {
        let mut conn = test_db();
        let stored = add_entry(&mut conn, Collection::KnowledgeBase, entry("old", spike(0))).unwrap();

        update_entry(
            &mut conn,
            Collection::KnowledgeBase,
            &stored.id,
            entry("new", spike(3)),
        )
        .unwrap();

        let all = get_all(&conn, Collection::KnowledgeBase).unwrap();
        assert_eq!(all[0].document, "new");
        assert!(all[0].updated_at >= all[0].created_at);

        // the index now answers for the new embedding
        let hits = search(&conn, Collection::KnowledgeBase, &spike(3), 1).unwrap();
        assert_eq!(hits[0].id, stored.id);
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut conn = test_db();
        let err = update_entry(
            &mut conn,
            Collection::KnowledgeBase,
            "missing",
            entry("doc", spike(0)),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn delete_removes_from_both_tables_and_is_idempotent() {
        let mut conn = test_db();
        let stored = add_entry(&mut conn, Collection::KnowledgeBase, entry("doc", spike(0))).unwrap();

        delete_entry(&mut conn, Collection::KnowledgeBase, &stored.id).unwrap();
        assert!(get_all(&conn, Collection::KnowledgeBase).unwrap().is_empty());
        assert!(search(&conn, Collection::KnowledgeBase, &spike(0), 5)
            .unwrap()
            .is_empty());

        // second delete is still fine
        delete_entry(&mut conn, Collection::KnowledgeBase, &stored.id).unwrap();
    }

    #[test]
    fn upsert_inserts_then_replaces() {
        let mut conn = test_db();

        upsert_entry(
            &mut conn,
            Collection::Conversations,
            "conv-1",
            entry("user: hi", spike(0)),
        )
        .unwrap();
        upsert_entry(
            &mut conn,
            Collection::Conversations,
            "conv-1",
            entry("user: hi\nassistant: hello", spike(1)),
        )
        .unwrap();

        let all = get_all(&conn, Collection::Conversations).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "conv-1");
        assert_eq!(all[0].document, "user: hi\nassistant: hello");
    }

    #[test]
    fn batch_add_assigns_distinct_ids() {
        let mut conn = test_db();
        let ids = batch_add(
            &mut conn,
            Collection::KnowledgeBase,
            &[entry("a", spike(0)), entry("b", spike(1)), entry("c", spike(2))],
        )
        .unwrap();

        assert_eq!(ids.len(), 3);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(get_all(&conn, Collection::KnowledgeBase).unwrap().len(), 3);
    }
}
