//! Message and tool-call types shared by the chat client and the agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed instruction prepended by the orchestrator.
    System,
    /// End-user input.
    User,
    /// Model output, either a final answer or tool requests.
    Assistant,
    /// Result of an executed tool call.
    Tool,
}

/// A structured request, issued by the reasoning step, to invoke a named tool.
///
/// The `id` is the correlation identifier: the matching tool-result message
/// must echo it so the model can associate outputs with requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation identifier assigned by the model.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Model-supplied arguments as a JSON object.
    pub arguments: Value,
}

/// One entry in a conversation history.
///
/// Serializable so checkpoint stores can persist histories verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author.
    pub role: Role,
    /// Text content; empty for assistant messages that only request tools.
    pub content: String,
    /// Tool calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Correlation identifier carried by tool-result messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Build a system instruction message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Build an assistant message carrying a final answer.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Build an assistant message that requests tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// Build a tool-result message correlated with the originating request.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Classify an assistant reply into the branch the state machine acts on.
    pub fn into_turn(self) -> AssistantTurn {
        if self.tool_calls.is_empty() {
            AssistantTurn::FinalAnswer(self.content)
        } else {
            AssistantTurn::ToolRequests(self.tool_calls)
        }
    }
}

/// Outcome of one reasoning step, switched on explicitly by the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantTurn {
    /// The reply contains no tool requests; its content is the final answer.
    FinalAnswer(String),
    /// The reply asks for one or more tool executions, in order.
    ToolRequests(Vec<ToolCallRequest>),
}

/// Description of a callable capability advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    /// Tool name the model uses in its requests.
    pub name: String,
    /// Natural-language description of when to use the tool.
    pub description: String,
    /// JSON-schema object describing the model-controlled arguments.
    pub parameters: Value,
}
