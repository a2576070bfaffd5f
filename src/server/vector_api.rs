//! Vector service HTTP surface.
//!
//! CRUD plus similarity search over the three collections, and the naive
//! RAG endpoint. Every write re-embeds the document text with the shared
//! embedding provider before it touches the index.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::error::{ApiError, ApiResult};
use crate::responder::ChatTurn;
use crate::vector::rag::{self, RagResponse};
use crate::vector::store::{self, NewEntry};
use crate::vector::types::{Collection, SearchHit, VectorEntry};

use super::{with_connection, VectorState};

pub fn router(state: VectorState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/add-knowledge", post(add_knowledge))
        .route("/api/batch-add-knowledge", post(batch_add_knowledge))
        .route("/api/search-knowledge", post(search_knowledge))
        .route("/api/get-all-knowledge", get(get_all_knowledge))
        .route("/api/update-knowledge/{id}", put(update_knowledge))
        .route("/api/delete-knowledge/{id}", delete(delete_knowledge))
        .route("/api/save-conversation", post(save_conversation))
        .route("/api/search-conversations", post(search_conversations))
        .route("/api/generate-rag-response", post(generate_rag))
        .route("/api/save-profile", post(save_profile))
        .route("/api/search-profiles", post(search_profiles))
        .route("/api/get-all-profiles", get(get_all_profiles))
        .route("/api/delete-profile/{id}", delete(delete_profile))
        .with_state(state)
}

// ── Request/response payloads ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddTextRequest {
    pub text: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct BatchAddRequest {
    pub items: Vec<AddTextRequest>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    3
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub vectors: Vec<VectorEntry>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SaveConversationRequest {
    pub conversation_id: String,
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
pub struct RagRequest {
    pub query: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
pub struct SaveProfileRequest {
    pub profile: serde_json::Value,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn health(State(state): State<VectorState>) -> ApiResult<Json<serde_json::Value>> {
    let entry_count: i64 = with_connection(state.db_path.clone(), |conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?)
    })
    .await?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "vector_db_connected": true,
        "model_loaded": true,
        "entry_count": entry_count,
    })))
}

async fn add_knowledge(
    State(state): State<VectorState>,
    Json(request): Json<AddTextRequest>,
) -> ApiResult<Json<MutationResponse>> {
    let stored = add_to_collection(&state, Collection::KnowledgeBase, request).await?;
    Ok(Json(MutationResponse {
        success: true,
        id: Some(stored.id),
        message: "Knowledge added successfully".into(),
    }))
}

async fn batch_add_knowledge(
    State(state): State<VectorState>,
    Json(request): Json<BatchAddRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let embedder = state.embedder.clone();
    let ids = with_connection(state.db_path.clone(), move |conn| {
        // items without text are skipped, matching the batch contract
        let items: Vec<AddTextRequest> = request
            .items
            .into_iter()
            .filter(|item| !item.text.trim().is_empty())
            .collect();

        let texts: Vec<&str> = items.iter().map(|item| item.text.as_str()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .map_err(|e| ApiError::Generation(format!("embedding failed: {e}")))?;

        let entries: Vec<NewEntry> = items
            .into_iter()
            .zip(embeddings)
            .map(|(item, embedding)| NewEntry {
                document: item.text,
                metadata: item.metadata,
                embedding,
            })
            .collect();
        store::batch_add(conn, Collection::KnowledgeBase, &entries)
    })
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "added_count": ids.len(),
        "message": "Batch knowledge added successfully",
    })))
}

async fn search_knowledge(
    State(state): State<VectorState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    search_collection(&state, Collection::KnowledgeBase, request).await
}

async fn get_all_knowledge(State(state): State<VectorState>) -> ApiResult<Json<ListResponse>> {
    list_collection(&state, Collection::KnowledgeBase).await
}

async fn update_knowledge(
    State(state): State<VectorState>,
    Path(id): Path<String>,
    Json(request): Json<AddTextRequest>,
) -> ApiResult<Json<MutationResponse>> {
    if request.text.trim().is_empty() {
        return Err(ApiError::Validation("text required".into()));
    }

    let embedder = state.embedder.clone();
    with_connection(state.db_path.clone(), move |conn| {
        let embedding = embed(embedder.as_ref(), &request.text)?;
        store::update_entry(
            conn,
            Collection::KnowledgeBase,
            &id,
            NewEntry {
                document: request.text,
                metadata: request.metadata,
                embedding,
            },
        )
    })
    .await?;

    Ok(Json(MutationResponse {
        success: true,
        id: None,
        message: "Knowledge updated successfully".into(),
    }))
}

async fn delete_knowledge(
    State(state): State<VectorState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MutationResponse>> {
    delete_from_collection(&state, Collection::KnowledgeBase, id).await?;
    Ok(Json(MutationResponse {
        success: true,
        id: None,
        message: "Knowledge deleted successfully".into(),
    }))
}

/// Serialize the transcript, embed it, and upsert under the conversation id
/// so a growing conversation keeps one entry.
async fn save_conversation(
    State(state): State<VectorState>,
    Json(request): Json<SaveConversationRequest>,
) -> ApiResult<Json<MutationResponse>> {
    if request.conversation_id.trim().is_empty() {
        return Err(ApiError::Validation("conversation_id required".into()));
    }

    let transcript = request
        .messages
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n");
    let metadata = serde_json::json!({
        "conversation_id": request.conversation_id,
        "message_count": request.messages.len(),
        "type": "conversation",
    });

    let embedder = state.embedder.clone();
    let conversation_id = request.conversation_id.clone();
    with_connection(state.db_path.clone(), move |conn| {
        let embedding = embed(embedder.as_ref(), &transcript)?;
        store::upsert_entry(
            conn,
            Collection::Conversations,
            &conversation_id,
            NewEntry {
                document: transcript,
                metadata: Some(metadata),
                embedding,
            },
        )
    })
    .await?;

    Ok(Json(MutationResponse {
        success: true,
        id: Some(request.conversation_id),
        message: "Conversation saved successfully".into(),
    }))
}

async fn search_conversations(
    State(state): State<VectorState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    search_collection(&state, Collection::Conversations, request).await
}

async fn generate_rag(
    State(state): State<VectorState>,
    Json(request): Json<RagRequest>,
) -> ApiResult<Json<RagResponse>> {
    if request.query.trim().is_empty() {
        return Err(ApiError::Validation("query required".into()));
    }
    tracing::debug!(
        history_turns = request.conversation_history.len(),
        "rag request"
    );

    let embedder = state.embedder.clone();
    let config = state.config.clone();
    let result = with_connection(state.db_path.clone(), move |conn| {
        let query_embedding = embed(embedder.as_ref(), &request.query)?;
        rag::generate_rag_response(conn, &query_embedding, &request.query, &config.rag)
    })
    .await?;

    Ok(Json(result))
}

/// Flatten the profile document into text for embedding; the structured
/// profile itself rides along as metadata.
async fn save_profile(
    State(state): State<VectorState>,
    Json(request): Json<SaveProfileRequest>,
) -> ApiResult<Json<MutationResponse>> {
    let text = profile_text(&request.profile);
    if text.trim().is_empty() {
        return Err(ApiError::Validation("profile required".into()));
    }

    let stored = add_to_collection(
        &state,
        Collection::UserProfiles,
        AddTextRequest {
            text,
            metadata: Some(request.profile),
        },
    )
    .await?;

    Ok(Json(MutationResponse {
        success: true,
        id: Some(stored.id),
        message: "Profile saved successfully".into(),
    }))
}

async fn search_profiles(
    State(state): State<VectorState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    search_collection(&state, Collection::UserProfiles, request).await
}

async fn get_all_profiles(State(state): State<VectorState>) -> ApiResult<Json<ListResponse>> {
    list_collection(&state, Collection::UserProfiles).await
}

async fn delete_profile(
    State(state): State<VectorState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MutationResponse>> {
    delete_from_collection(&state, Collection::UserProfiles, id).await?;
    Ok(Json(MutationResponse {
        success: true,
        id: None,
        message: "Profile deleted successfully".into(),
    }))
}

// ── Shared plumbing ───────────────────────────────────────────────────────────

async fn add_to_collection(
    state: &VectorState,
    collection: Collection,
    request: AddTextRequest,
) -> ApiResult<VectorEntry> {
    if request.text.trim().is_empty() {
        return Err(ApiError::Validation("text required".into()));
    }

    let embedder = state.embedder.clone();
    with_connection(state.db_path.clone(), move |conn| {
        let embedding = embed(embedder.as_ref(), &request.text)?;
        store::add_entry(
            conn,
            collection,
            NewEntry {
                document: request.text,
                metadata: request.metadata,
                embedding,
            },
        )
    })
    .await
}

async fn search_collection(
    state: &VectorState,
    collection: Collection,
    request: SearchRequest,
) -> ApiResult<Json<SearchResponse>> {
    if request.query.trim().is_empty() {
        return Err(ApiError::Validation("query required".into()));
    }

    let embedder = state.embedder.clone();
    let results = with_connection(state.db_path.clone(), move |conn| {
        let query_embedding = embed(embedder.as_ref(), &request.query)?;
        store::search(conn, collection, &query_embedding, request.k)
    })
    .await?;

    let count = results.len();
    Ok(Json(SearchResponse { results, count }))
}

async fn list_collection(
    state: &VectorState,
    collection: Collection,
) -> ApiResult<Json<ListResponse>> {
    let vectors = with_connection(state.db_path.clone(), move |conn| {
        store::get_all(conn, collection)
    })
    .await?;

    let count = vectors.len();
    Ok(Json(ListResponse { vectors, count }))
}

async fn delete_from_collection(
    state: &VectorState,
    collection: Collection,
    id: String,
) -> ApiResult<()> {
    with_connection(state.db_path.clone(), move |conn| {
        store::delete_entry(conn, collection, &id)
    })
    .await
}

fn embed(embedder: &dyn EmbeddingProvider, text: &str) -> ApiResult<Vec<f32>> {
    embedder
        .embed(text)
        .map_err(|e| ApiError::Generation(format!("embedding failed: {e}")))
}

fn profile_text(profile: &serde_json::Value) -> String {
    match profile {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("{key}: {s}"),
                other => format!("{key}: {other}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_text_flattens_objects_to_lines() {
        let profile = serde_json::json!({
            "name": "Asha",
            "age": 34,
            "conditions": ["asthma"],
        });
        let text = profile_text(&profile);
        assert!(text.contains("name: Asha"));
        assert!(text.contains("age: 34"));
        assert!(text.contains("conditions: [\"asthma\"]"));
    }

    #[test]
    fn profile_text_passes_strings_through() {
        let profile = serde_json::json!("free text profile");
        assert_eq!(profile_text(&profile), "free text profile");
    }

    #[test]
    fn default_k_is_three() {
        let request: SearchRequest =
            serde_json::from_value(serde_json::json!({"query": "fever"})).unwrap();
        assert_eq!(request.k, 3);
    }
}
