//! Vector collections and similarity search.
//!
//! Three independent collections (general knowledge, saved conversations,
//! user profiles) persist in their own SQLite file: documents and metadata
//! in a plain table, embeddings in one sqlite-vec `vec0` virtual table per
//! collection. KNN runs on L2 distance over L2-normalized vectors and is
//! converted to cosine distance at the boundary.

pub mod rag;
pub mod store;
pub mod types;

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// Cosine distance from the L2 distance of two unit vectors: `d² / 2`.
pub fn l2_to_cosine_distance(l2: f64) -> f64 {
    (l2 * l2) / 2.0
}
