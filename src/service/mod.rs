//! Service facade exposing the boundary operations to the external API layer.

mod knowledge;
pub mod types;

pub use knowledge::KnowledgeService;
pub use types::{DocumentChunk, EnsureCollectionOutcome, IngestOutcome, ServiceError};
