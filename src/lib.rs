#![deny(missing_docs)]

//! Core library for the Knowledge Bot document question-answering service.
//!
//! Documents arrive already split into chunks, get embedded and indexed into a
//! per-conversation Qdrant collection, and a tool-calling conversation loop
//! answers questions by deciding between retrieval, calculation, and a direct
//! reply. HTTP routing and PDF parsing live outside this crate.

/// Conversational agent: tools, checkpoints, and the reason/act loop.
pub mod agent;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Chat-completion collaborator: message types and the OpenAI-compatible client.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and conversation metrics helpers.
pub mod metrics;
/// Qdrant vector store gateway.
pub mod qdrant;
/// Two-stage retrieve-then-generate pipeline.
pub mod retrieval;
/// Service facade exposing the boundary operations.
pub mod service;
