//! Per-thread conversation persistence.
//!
//! The agent checkpoints the full message history after every completed turn
//! so a later invocation with the same thread identifier resumes from the
//! stored exchange instead of starting empty. The store is pluggable; the
//! bundled in-memory implementation backs tests and single-process
//! deployments, while durable backends implement the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::llm::ChatMessage;

/// Errors raised by checkpoint backends.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Backend failed to read or write a thread record.
    #[error("Checkpoint storage failed: {0}")]
    Storage(String),
}

/// Interface implemented by conversation persistence backends.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the stored history for a thread, `None` for unseen threads.
    async fn load(&self, thread_id: &str) -> Result<Option<Vec<ChatMessage>>, CheckpointError>;

    /// Replace the stored history for a thread.
    async fn save(&self, thread_id: &str, history: &[ChatMessage]) -> Result<(), CheckpointError>;
}

/// Process-local checkpoint store keyed by thread identifier.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    threads: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl InMemoryCheckpointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<Vec<ChatMessage>>, CheckpointError> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &str, history: &[ChatMessage]) -> Result<(), CheckpointError> {
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), history.to_vec());
        Ok(())
    }
}
