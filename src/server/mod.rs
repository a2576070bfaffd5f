//! The two axum services.
//!
//! [`serve_chat`] runs the chatbot API (consultations, review, accounts);
//! [`serve_vector`] runs the vector-database API. Each builds its state once
//! at startup — config, strategy objects, database path — and hands it to
//! every handler; request handlers open their own short-lived database
//! connection and close it before returning, so no connection is shared.

pub mod chat_api;
pub mod vector_api;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;

use crate::config::HealthchatConfig;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{ApiError, ApiResult};
use crate::responder::{self, AdvisoryResponder};

/// Shared state for the chat service. Built once, cloned per request.
#[derive(Clone)]
pub struct ChatState {
    pub config: Arc<HealthchatConfig>,
    pub responder: Arc<dyn AdvisoryResponder>,
    pub db_path: PathBuf,
}

/// Shared state for the vector service.
#[derive(Clone)]
pub struct VectorState {
    pub config: Arc<HealthchatConfig>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub db_path: PathBuf,
}

/// Start the chat service.
pub async fn serve_chat(config: HealthchatConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    // Initialize schema and the bootstrap doctor once; request handlers open
    // their own connections afterwards.
    let conn = db::open_chat_database(&db_path)?;
    db::bootstrap_doctor(&conn, &config.doctor)?;
    drop(conn);

    let responder = responder::create_responder(&config.responder)?;
    tracing::info!(provider = %config.responder.provider, "advisory responder ready");

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = ChatState {
        config: Arc::new(config),
        responder: Arc::from(responder),
        db_path,
    };

    let router = chat_api::router(state);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "chat service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Start the vector service.
pub async fn serve_vector(config: HealthchatConfig) -> Result<()> {
    let db_path = config.resolved_vector_db_path();

    let conn = db::open_vector_database(&db_path, &config.embedding.model)?;
    drop(conn);

    let embedder = embedding::create_provider(&config.embedding)?;
    tracing::info!(
        model = %config.embedding.model,
        dims = embedder.dimensions(),
        "embedding provider ready"
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.vector_port);
    let state = VectorState {
        config: Arc::new(config),
        embedder: Arc::from(embedder),
        db_path,
    };

    let router = vector_api::router(state);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "vector service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
    tracing::info!("shutting down");
}

/// Run a closure against a fresh connection on the blocking pool.
///
/// SQLite calls are synchronous; this keeps them off the async workers and
/// gives every request its own connection.
pub(crate) async fn with_connection<T, F>(db_path: PathBuf, f: F) -> ApiResult<T>
where
    F: FnOnce(&mut rusqlite::Connection) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn =
            db::connect(&db_path).map_err(|e| ApiError::Storage(e.to_string()))?;
        f(&mut conn)
    })
    .await
    .map_err(|e| ApiError::Storage(format!("blocking task failed: {e}")))?
}
