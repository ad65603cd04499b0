//! Conversational agent: tool layer, checkpointing, and the reason/act loop.

pub mod checkpoint;
pub mod machine;
pub mod tools;

pub use checkpoint::{CheckpointError, CheckpointStore, InMemoryCheckpointStore};
pub use machine::{AgentError, ConversationAgent, ConverseOutcome};
pub use tools::{SessionContext, ToolError, ToolSet};
