//! Shared types used by the Qdrant gateway and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with the vector store.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// Collection name violates backend naming rules.
    #[error("Invalid collection name: {0}")]
    InvalidName(String),
    /// Transport failure before a response was received. Retryable upstream.
    #[error("Vector store unreachable: {0}")]
    Unavailable(#[from] reqwest::Error),
    /// Operation referenced a collection that was never created.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Prepared point ready for indexing: one chunk plus its embedding.
#[derive(Debug, Clone)]
pub struct ChunkInsert {
    /// Chunk text.
    pub content: String,
    /// Original source filename, verbatim.
    pub source: String,
    /// Zero-based page number within the source document.
    pub page: u32,
    /// Normalized filename key used for filtering.
    pub filename: String,
    /// Embedding vector produced for the chunk.
    pub vector: Vec<f32>,
}

/// Scored chunk returned by similarity search, ordered by decreasing score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChunkHit {
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Stored chunk text.
    pub content: String,
    /// Original source filename.
    pub source: String,
    /// Page number within the source document.
    pub page: u32,
    /// Normalized filename key.
    pub filename: String,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

impl QueryPoint {
    /// Map a scored point payload onto the chunk schema written at ingestion.
    pub(crate) fn into_hit(self) -> ChunkHit {
        let payload = self.payload.unwrap_or_default();
        let text_field = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        ChunkHit {
            score: self.score,
            content: text_field("content"),
            source: text_field("source"),
            page: payload
                .get("page")
                .and_then(Value::as_u64)
                .unwrap_or_default() as u32,
            filename: text_field("filename"),
        }
    }
}
