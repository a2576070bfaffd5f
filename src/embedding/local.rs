//! Local ONNX Runtime embedding provider.
//!
//! Runs all-MiniLM-L6-v2 via `ort`: tokenize, batched inference,
//! attention-masked mean pooling, L2 normalization.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// Maximum sequence length for all-MiniLM-L6-v2 (trained at 256).
const MAX_SEQ_LEN: usize = 256;

pub struct LocalEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex, which
// guarantees exclusive access during run().
unsafe impl Send for LocalEmbedder {}
unsafe impl Sync for LocalEmbedder {}

/// Flattened i64 input tensors for one batch.
struct BatchInputs {
    shape: Vec<i64>,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
}

impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        let model_path = cache_dir.join("model.onnx");
        let tokenizer_path = cache_dir.join("tokenizer.json");

        anyhow::ensure!(
            model_path.exists() && tokenizer_path.exists(),
            "embedding model files missing under {}. Run `healthchat model download` first.",
            cache_dir.display()
        );

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;
        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let tokenizer = load_tokenizer(tokenizer_path)?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn tokenize(&self, texts: &[&str]) -> Result<BatchInputs> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        Ok(BatchInputs {
            shape: vec![batch_size as i64, seq_len as i64],
            input_ids,
            attention_mask,
        })
    }
}

fn load_tokenizer(path: PathBuf) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(&path)
        .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;

    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length: MAX_SEQ_LEN,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;

    tokenizer.with_padding(Some(tokenizers::PaddingParams {
        strategy: tokenizers::PaddingStrategy::BatchLongest,
        ..Default::default()
    }));

    tracing::info!(tokenizer = %path.display(), "tokenizer loaded");
    Ok(tokenizer)
}

impl EmbeddingProvider for LocalEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text])?;
        Ok(results.into_iter().next().expect("batch had one input"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let inputs = self.tokenize(texts)?;
        let batch_size = inputs.shape[0] as usize;
        let seq_len = inputs.shape[1] as usize;

        let input_ids =
            Tensor::from_array((inputs.shape.clone(), inputs.input_ids.into_boxed_slice()))?;
        let attention_mask_flat = inputs.attention_mask;
        let attention_mask = Tensor::from_array((
            inputs.shape.clone(),
            attention_mask_flat.clone().into_boxed_slice(),
        ))?;
        // token_type_ids: all zeros (single sentence, no segment B)
        let token_type_ids = Tensor::from_array((
            inputs.shape.clone(),
            vec![0i64; batch_size * seq_len].into_boxed_slice(),
        ))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;

        let outputs = session.run(ort::inputs! {
            "input_ids" => input_ids,
            "attention_mask" => attention_mask,
            "token_type_ids" => token_type_ids,
        })?;

        // The output name varies by ONNX export. Try common names, fall back
        // to index 0.
        let token_emb = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (shape, data) = token_emb
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings tensor")?;

        let dims: &[i64] = &shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[2] == EMBEDDING_DIM as i64,
            "unexpected token embeddings shape: {dims:?}, expected [batch, seq, {EMBEDDING_DIM}]"
        );
        let actual_seq_len = dims[1] as usize;

        let pooled = (0..batch_size)
            .map(|b| {
                let mask_row = &attention_mask_flat[b * seq_len..b * seq_len + actual_seq_len];
                let token_rows = &data[b * actual_seq_len * EMBEDDING_DIM
                    ..(b + 1) * actual_seq_len * EMBEDDING_DIM];
                l2_normalize(&mean_pool(token_rows, mask_row))
            })
            .collect();

        Ok(pooled)
    }
}

/// Attention-masked mean over the token dimension.
fn mean_pool(token_rows: &[f32], mask: &[i64]) -> Vec<f32> {
    let mut sum = vec![0.0f32; EMBEDDING_DIM];
    let mut count = 0.0f32;

    for (s, &m) in mask.iter().enumerate() {
        if m > 0 {
            let row = &token_rows[s * EMBEDDING_DIM..(s + 1) * EMBEDDING_DIM];
            for (acc, &x) in sum.iter_mut().zip(row) {
                *acc += x;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        for x in &mut sum {
            *x /= count;
        }
    }
    sum
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
