//! Retrieval pipeline: similarity search plus grounded answer generation.

pub mod pipeline;
pub mod types;

pub use pipeline::RetrievalPipeline;
pub use types::{PipelineError, QueryContext, RetrievalOutcome};
