//! Naive retrieval-augmented response assembly.
//!
//! A formatting policy, not a ranking algorithm: pull top-k neighbors from
//! the knowledge and conversation collections, merge, sort ascending by
//! cosine distance, keep those under the configured threshold up to the
//! context cap, and splice their documents into a fixed reply template.

use rusqlite::Connection;
use serde::Serialize;

use crate::config::RagConfig;
use crate::error::ApiResult;

use super::store;
use super::types::Collection;

/// One context snippet that made it into the reply.
#[derive(Debug, Clone, Serialize)]
pub struct RagContext {
    /// `"knowledge"` or `"conversation"`.
    #[serde(rename = "type")]
    pub source: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub distance: f64,
}

#[derive(Debug, Serialize)]
pub struct RagResponse {
    pub response: String,
    pub contexts: Vec<RagContext>,
    pub context_count: usize,
}

/// Assemble a templated reply from the nearest stored contexts.
pub fn generate_rag_response(
    conn: &Connection,
    query_embedding: &[f32],
    query_text: &str,
    config: &RagConfig,
) -> ApiResult<RagResponse> {
    let mut contexts = Vec::new();

    for hit in store::search(conn, Collection::KnowledgeBase, query_embedding, config.knowledge_k)? {
        contexts.push(RagContext {
            source: "knowledge",
            content: hit.document,
            metadata: hit.metadata,
            distance: hit.distance,
        });
    }
    for hit in store::search(conn, Collection::Conversations, query_embedding, config.conversation_k)? {
        contexts.push(RagContext {
            source: "conversation",
            content: hit.document,
            metadata: hit.metadata,
            distance: hit.distance,
        });
    }

    contexts.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    contexts.retain(|ctx| ctx.distance < config.distance_threshold);
    contexts.truncate(config.max_contexts);

    let response = render_reply(query_text, &contexts);
    let context_count = contexts.len();

    Ok(RagResponse {
        response,
        contexts,
        context_count,
    })
}

fn render_reply(query: &str, contexts: &[RagContext]) -> String {
    if contexts.is_empty() {
        return format!(
            "I don't have specific information about that in my knowledge base. \
             Regarding your question: {query}"
        );
    }

    let joined = contexts
        .iter()
        .map(|ctx| ctx.content.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n");

    format!(
        "Based on the relevant information I found:\n\n{joined}\n\nIn response to your question: {query}"
    )
}
