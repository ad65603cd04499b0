//! Chat-completion collaborator.
//!
//! The model is external; the crate depends only on the [`ChatClient`] trait,
//! whose single operation takes a message history plus the advertised tool
//! schemas and returns the next assistant message.

pub mod openai;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiChatClient;
pub use types::{AssistantTurn, ChatMessage, Role, ToolCallRequest, ToolSpec};

use crate::config::get_config;

/// Errors surfaced while invoking the chat-completion collaborator.
#[derive(Debug, Error)]
pub enum ChatClientError {
    /// Endpoint was unreachable or does not exist.
    #[error("Chat provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Chat completion failed: {0}")]
    CompletionFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed chat response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by chat-completion backends.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Produce the next assistant message for the given history.
    ///
    /// The reply either carries a final text answer or requests one or more
    /// tool calls; [`ChatMessage::into_turn`] distinguishes the two.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatMessage, ChatClientError>;
}

/// Build the chat client described by the loaded configuration.
pub fn chat_client_from_config() -> OpenAiChatClient {
    let config = get_config();
    OpenAiChatClient::new(
        config.llm_url.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
    )
}
