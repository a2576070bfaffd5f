//! Chat service HTTP surface.
//!
//! `/chat` produces an advisory and persists the consultation; the doctor
//! endpoints drive the review workflow; `/register` and `/login` cover the
//! optional account registry. All failures map to `{"error": message}`
//! bodies through [`ApiError`].

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::accounts::{self, Account};
use crate::consult::types::Consultation;
use crate::consult::{auth, store};
use crate::error::{ApiError, ApiResult};
use crate::responder::{latest_user_message, ChatTurn};

use super::{with_connection, ChatState};

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/consultation", post(create_consultation))
        .route("/consultation/{id}", get(get_consultation))
        .route("/_list_recent", get(list_recent))
        .route("/doctor_review", post(doctor_review))
        .route("/register", post(register))
        .route("/login", post(login))
        .with_state(state)
}

// ── Request/response payloads ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Single-message form.
    pub message: Option<String>,
    /// Conversation form; wins over `message` when both are present.
    pub messages: Option<Vec<ChatTurn>>,
    pub user_id: Option<i64>,
    /// Optional system-instruction override for the generative strategy.
    pub system: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub consultation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateConsultationRequest {
    pub patient_label: String,
    pub symptoms: String,
    pub recommendation: String,
}

#[derive(Debug, Deserialize)]
pub struct DoctorReviewRequest {
    pub consult_id: String,
    pub action: String,
    pub doctor_name: String,
    pub doctor_note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DoctorReviewResponse {
    pub message: String,
    pub consultation_id: String,
    pub doctor_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: Account,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn root(State(state): State<ChatState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "healthchat",
        "version": env!("CARGO_PKG_VERSION"),
        "responder": state.config.responder.provider,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Produce an advisory and persist the consultation for later review.
async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let turns = conversation_from(&request)?;
    let advisory = state
        .responder
        .respond(&turns, request.system.as_deref())
        .await?;

    let patient_label = match request.user_id {
        Some(id) => format!("User_{id}"),
        None => "User_Anonymous".to_string(),
    };
    let symptoms = latest_user_message(&turns).unwrap_or_default().to_string();

    let recommendation = advisory.clone();
    let consultation = with_connection(state.db_path.clone(), move |conn| {
        store::create_consultation(conn, &patient_label, &symptoms, &recommendation)
    })
    .await?;

    Ok(Json(ChatResponse {
        response: advisory,
        consultation_id: consultation.id,
    }))
}

/// Record a consultation with an externally produced recommendation.
async fn create_consultation(
    State(state): State<ChatState>,
    Json(request): Json<CreateConsultationRequest>,
) -> ApiResult<Json<Consultation>> {
    if request.symptoms.trim().is_empty() {
        return Err(ApiError::Validation("symptoms required".into()));
    }

    let record = with_connection(state.db_path.clone(), move |conn| {
        store::create_consultation(
            conn,
            &request.patient_label,
            &request.symptoms,
            &request.recommendation,
        )
    })
    .await?;
    Ok(Json(record))
}

async fn get_consultation(
    State(state): State<ChatState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Consultation>> {
    let record = with_connection(state.db_path.clone(), move |conn| {
        store::get_consultation(conn, &id)
    })
    .await?;
    Ok(Json(record))
}

/// Pending consultations for the doctor panel, newest first.
async fn list_recent(State(state): State<ChatState>) -> ApiResult<Json<Vec<Consultation>>> {
    let records = with_connection(state.db_path.clone(), |conn| {
        store::list_pending(conn, store::DEFAULT_PENDING_LIMIT)
    })
    .await?;
    Ok(Json(records))
}

/// Apply a doctor review. The shared access key is verified before any
/// consultation state is read.
async fn doctor_review(
    State(state): State<ChatState>,
    headers: HeaderMap,
    Json(request): Json<DoctorReviewRequest>,
) -> ApiResult<Json<DoctorReviewResponse>> {
    let presented = headers
        .get("x-doctor-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let reviewed = with_connection(state.db_path.clone(), move |conn| {
        auth::verify_access_key(conn, presented.as_deref())?;
        store::apply_review(
            conn,
            &request.consult_id,
            &request.action,
            &request.doctor_name,
            request.doctor_note.as_deref(),
        )
    })
    .await?;

    Ok(Json(DoctorReviewResponse {
        message: format!("Consultation {} successfully", reviewed.status),
        consultation_id: reviewed.id,
        doctor_name: reviewed.doctor_name.unwrap_or_default(),
    }))
}

async fn register(
    State(state): State<ChatState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    let user_id = with_connection(state.db_path.clone(), move |conn| {
        accounts::register(conn, &request.name, &request.email, &request.password)
    })
    .await?;

    Ok(Json(RegisterResponse {
        message: "User registered successfully".into(),
        user_id,
    }))
}

async fn login(
    State(state): State<ChatState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let account = with_connection(state.db_path.clone(), move |conn| {
        accounts::login(conn, &request.email, &request.password)
    })
    .await?;

    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        user: account,
    }))
}

/// Normalize the two request forms into one conversation.
fn conversation_from(request: &ChatRequest) -> ApiResult<Vec<ChatTurn>> {
    if let Some(messages) = &request.messages {
        if !messages.is_empty() {
            return Ok(messages.clone());
        }
    }
    match request.message.as_deref() {
        Some(message) if !message.trim().is_empty() => Ok(vec![ChatTurn::user(message)]),
        _ => Err(ApiError::Validation("message or messages required".into())),
    }
}
