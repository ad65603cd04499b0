//! The conversational reason/act loop.
//!
//! Each invocation loads the thread's checkpointed history, appends the new
//! user message, and alternates between a reasoning step (chat completion
//! with the tool schemas) and tool execution until the model replies without
//! tool requests. Invocations against the same thread are serialized by a
//! per-thread async mutex; the checkpoint is a read-modify-write of the whole
//! history and would corrupt under interleaving.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::llm::{AssistantTurn, ChatClient, ChatClientError, ChatMessage};

use super::checkpoint::{CheckpointError, CheckpointStore};
use super::tools::{SessionContext, ToolError, ToolSet};

const SYSTEM_INSTRUCTION: &str = "You are a Knowledge Bot that helps users find information from their uploaded documents. \
IMPORTANT: Always try to search the document collection first using the search_documents tool when users ask questions. \
Only ask them to upload documents if the search returns no results or if there are clearly no documents in the system. \
Don't ask users to upload documents unless you've first attempted to search the existing document collection.";

/// Errors emitted by the conversational agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Chat-completion collaborator failed during a reasoning step.
    #[error("Reasoning step failed: {0}")]
    Model(#[from] ChatClientError),
    /// A requested tool call failed; surfaced as a hard failure.
    #[error("Tool execution failed: {0}")]
    Tool(#[from] ToolError),
    /// Checkpoint backend failed to load or save the thread history.
    #[error("Checkpoint access failed: {0}")]
    Checkpoint(#[from] CheckpointError),
    /// The reason/act loop hit its cycle bound without a final answer.
    #[error("Conversation exceeded {limit} reason/act cycles without a final answer")]
    MaxCyclesExceeded {
        /// Configured cycle limit.
        limit: usize,
    },
}

/// Final answer produced for one conversational turn.
#[derive(Debug, Clone)]
pub struct ConverseOutcome {
    /// The assistant's answer text.
    pub answer: String,
    /// Number of reason/act cycles the turn consumed.
    pub cycles: usize,
}

/// Per-thread conversational state machine.
pub struct ConversationAgent {
    chat: Arc<dyn ChatClient>,
    tools: ToolSet,
    checkpoints: Arc<dyn CheckpointStore>,
    max_cycles: usize,
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationAgent {
    /// Build an agent from explicit collaborator handles.
    pub fn new(
        chat: Arc<dyn ChatClient>,
        tools: ToolSet,
        checkpoints: Arc<dyn CheckpointStore>,
        max_cycles: usize,
    ) -> Self {
        Self {
            chat,
            tools,
            checkpoints,
            max_cycles: max_cycles.max(1),
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run one conversational turn to completion.
    ///
    /// The returned answer is the first assistant reply containing no tool
    /// requests. History (including tool traffic) is checkpointed before
    /// returning, also on the cycle-bound error path so the thread state
    /// reflects what actually happened.
    pub async fn converse(
        &self,
        thread_id: &str,
        user_query: &str,
        selected_files: Option<Vec<String>>,
    ) -> Result<ConverseOutcome, AgentError> {
        let lock = self.thread_lock(thread_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run_turn(thread_id, user_query, selected_files).await
        };
        drop(lock);
        self.prune_thread_lock(thread_id).await;
        result
    }

    async fn run_turn(
        &self,
        thread_id: &str,
        user_query: &str,
        selected_files: Option<Vec<String>>,
    ) -> Result<ConverseOutcome, AgentError> {
        let mut history = self
            .checkpoints
            .load(thread_id)
            .await?
            .unwrap_or_default();
        let prior_messages = history.len();
        history.push(ChatMessage::user(user_query));

        let session = SessionContext {
            thread_id: thread_id.to_string(),
            selected_files,
        };

        tracing::info!(
            thread_id,
            prior_messages,
            "Starting conversational turn"
        );

        for cycle in 1..=self.max_cycles {
            let reply = self.reason(&history).await?;
            history.push(reply.clone());

            match reply.into_turn() {
                AssistantTurn::FinalAnswer(answer) => {
                    self.checkpoints.save(thread_id, &history).await?;
                    tracing::info!(thread_id, cycles = cycle, "Conversational turn complete");
                    return Ok(ConverseOutcome { answer, cycles: cycle });
                }
                AssistantTurn::ToolRequests(calls) => {
                    tracing::debug!(
                        thread_id,
                        cycle,
                        requested = calls.len(),
                        "Acting on tool requests"
                    );
                    for call in &calls {
                        let result = self.tools.execute(call, &session).await?;
                        history.push(result);
                    }
                }
            }
        }

        self.checkpoints.save(thread_id, &history).await?;
        tracing::warn!(
            thread_id,
            limit = self.max_cycles,
            "Cycle bound reached without a final answer"
        );
        Err(AgentError::MaxCyclesExceeded {
            limit: self.max_cycles,
        })
    }

    /// One reasoning step: fixed system instruction plus the full history.
    ///
    /// The system message is prepended per call rather than stored, so the
    /// checkpointed history holds only the actual exchange.
    async fn reason(&self, history: &[ChatMessage]) -> Result<ChatMessage, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(SYSTEM_INSTRUCTION));
        messages.extend_from_slice(history);

        let reply = self.chat.complete(&messages, &ToolSet::specs()).await?;
        Ok(reply)
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the thread's lock entry once no invocation holds a handle to it,
    /// so the map does not grow with every distinct thread id.
    async fn prune_thread_lock(&self, thread_id: &str) {
        let mut locks = self.thread_locks.lock().await;
        if let Some(entry) = locks.get(thread_id)
            && Arc::strong_count(entry) == 1
        {
            locks.remove(thread_id);
        }
    }
}
