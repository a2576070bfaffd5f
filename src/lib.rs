//! Health-advice chatbot backend with a human review loop.
//!
//! healthchat answers free-text symptom messages with either canned,
//! keyword-routed advice or a generative model reply, and records every
//! exchange as a *consultation* that a doctor later approves or annotates.
//! A companion vector service indexes free-text knowledge and profile
//! entries for similarity search and a naive retrieval-augmented reply.
//!
//! # Architecture
//!
//! - **Chat service**: axum HTTP API over SQLite — consultations, users,
//!   and the doctor review workflow
//! - **Vector service**: axum HTTP API over a second SQLite file using
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) for KNN search
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384 dims)
//! - **Advisory strategies**: rule-based keyword routing or a Gemini-style
//!   chat-completion call, selected by configuration
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`error`] — The API error taxonomy and HTTP response mapping
//! - [`consult`] — Consultation records and the doctor review state machine
//! - [`accounts`] — User registration and login
//! - [`responder`] — Advisory responder strategies (rules / generative)
//! - [`embedding`] — Text-to-vector embedding pipeline via ONNX Runtime
//! - [`vector`] — Vector collections and the RAG context assembler

pub mod accounts;
pub mod config;
pub mod consult;
pub mod db;
pub mod embedding;
pub mod error;
pub mod responder;
pub mod vector;
