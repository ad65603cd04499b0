//! Boundary types and errors for the service facade.

use thiserror::Error;

use crate::agent::AgentError;
use crate::embedding::EmbeddingClientError;
use crate::qdrant::QdrantError;
use crate::retrieval::PipelineError;

/// One pre-split unit of document text supplied by the ingestion collaborator.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    /// Chunk text.
    pub content: String,
    /// Source filename the chunk came from, verbatim.
    pub source: String,
    /// Zero-based page number within the source document.
    pub page: u32,
}

/// Result of an `ensure_collection` call.
#[derive(Debug, Clone, Copy)]
pub struct EnsureCollectionOutcome {
    /// `true` when this call created the collection, `false` for a no-op.
    pub created: bool,
}

/// Result of an `ingest` call.
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    /// Number of chunks embedded and written to the store.
    pub stored: usize,
}

/// Errors surfaced across the service boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or out-of-policy input; surfaced verbatim, never retried.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Vector store operation failed (including missing collections).
    #[error("Vector store operation failed: {0}")]
    Store(#[from] QdrantError),
    /// Ingestion failed partway through; `stored` chunks were already written
    /// and are not rolled back.
    #[error("Ingestion failed after storing {stored} chunks: {source}")]
    Ingestion {
        /// Chunks successfully written before the failure.
        stored: usize,
        /// Underlying embedding or store failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Retrieval pipeline failed.
    #[error("Retrieval failed: {0}")]
    Pipeline(#[from] PipelineError),
    /// Conversational turn failed.
    #[error("Conversation failed: {0}")]
    Agent(#[from] AgentError),
}

impl ServiceError {
    pub(crate) fn ingestion(stored: usize, source: EmbeddingOrStore) -> Self {
        let source: Box<dyn std::error::Error + Send + Sync> = match source {
            EmbeddingOrStore::Embedding(error) => Box::new(error),
            EmbeddingOrStore::Store(error) => Box::new(error),
        };
        Self::Ingestion { stored, source }
    }
}

pub(crate) enum EmbeddingOrStore {
    Embedding(EmbeddingClientError),
    Store(QdrantError),
}
