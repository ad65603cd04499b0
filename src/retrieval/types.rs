//! Data types and errors for the retrieve-then-generate pipeline.

use thiserror::Error;

use crate::embedding::EmbeddingClientError;
use crate::llm::ChatClientError;
use crate::qdrant::{ChunkHit, QdrantError};

/// Transient parameters for one retrieval call; never persisted.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Target collection (the conversation's namespace).
    pub collection: String,
    /// Natural-language question to answer.
    pub question: String,
    /// Optional restriction to chunks originating from these files.
    pub selected_files: Option<Vec<String>>,
    /// Result count override; the pipeline default applies when `None`.
    pub k: Option<usize>,
}

/// Answer plus the context chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    /// Generated answer text.
    pub answer: String,
    /// Chunks supplied to the generation step, in retrieval order.
    pub context: Vec<ChunkHit>,
}

/// Errors emitted by the retrieval pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Embedding collaborator failed to produce a query vector.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding collaborator returned no vectors for the question.
    #[error("Embedding provider returned no vectors for the query")]
    EmptyEmbedding,
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the collection was created with.
        expected: usize,
        /// Dimension actually produced by the provider.
        actual: usize,
    },
    /// Vector store request failed.
    #[error("Vector store request failed: {0}")]
    Store(#[from] QdrantError),
    /// Chat-completion collaborator failed during answer generation.
    #[error("Answer generation failed: {0}")]
    Model(#[from] ChatClientError),
}
