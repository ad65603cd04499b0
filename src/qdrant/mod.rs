//! Qdrant vector store gateway.

pub mod client;
pub mod filters;
pub mod payload;
pub mod types;

pub use client::QdrantGateway;
pub use filters::build_filename_filter;
pub use payload::normalize_filename;
pub use types::{ChunkHit, ChunkInsert, QdrantError};
