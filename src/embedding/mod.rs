//! Text-to-vector embedding pipeline.
//!
//! [`EmbeddingProvider`] turns free text into L2-normalized vectors of
//! [`EMBEDDING_DIM`] dimensions. The only implementation embeds locally with
//! all-MiniLM-L6-v2 over ONNX Runtime — the same model family the vector
//! collections were designed around. The provider is a read-only singleton:
//! built once at startup, shared via `Arc`, never mutated afterwards.

pub mod local;

use anyhow::Result;

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// Methods are synchronous; async callers wrap them in
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for
    /// batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"local"` is supported. Fails if the model files are not
/// present — run `healthchat model download` first.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Box::new(local::LocalEmbedder::new(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local"),
    }
}
