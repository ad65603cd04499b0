//! Callable capabilities exposed to the reasoning step.
//!
//! Tool arguments come in two distinct sets: the model-controlled arguments
//! described by the advertised schemas, and the orchestrator-controlled
//! [`SessionContext`] (conversation id, selected-file filter) that the model
//! never sees and cannot override. Keeping the namespace out of the schema is
//! what stops the model from reading another conversation's documents.

use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;

use crate::llm::{ChatMessage, ToolCallRequest, ToolSpec};
use crate::retrieval::{PipelineError, QueryContext, RetrievalPipeline};

/// Name of the two-integer addition tool.
pub const CALCULATOR_TOOL: &str = "calculator";
/// Name of the document retrieval tool.
pub const SEARCH_TOOL: &str = "search_documents";

/// Errors raised while executing a requested tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model requested a tool this layer does not provide.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    /// Model-supplied arguments did not match the advertised schema.
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments {
        /// Tool whose arguments failed validation.
        tool: String,
        /// Description of the mismatch.
        message: String,
    },
    /// The retrieval tool's delegated pipeline run failed.
    #[error("Document retrieval failed: {0}")]
    Retrieval(#[from] PipelineError),
}

/// Ambient per-invocation context injected by the orchestration layer.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Conversation identifier, doubling as the retrieval namespace.
    pub thread_id: String,
    /// File filter selected by the caller for this turn.
    pub selected_files: Option<Vec<String>>,
}

/// The agent's tool layer, wired to a concrete retrieval pipeline.
pub struct ToolSet {
    pipeline: Arc<RetrievalPipeline>,
}

impl ToolSet {
    /// Build the tool layer around the pipeline it delegates retrieval to.
    pub fn new(pipeline: Arc<RetrievalPipeline>) -> Self {
        Self { pipeline }
    }

    /// Schemas advertised to the model.
    ///
    /// Note the retrieval schema exposes only the query string; namespace and
    /// file scope are withheld from the model-controlled surface.
    pub fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: CALCULATOR_TOOL.to_string(),
                description: "Use this tool to add two numbers.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "a": { "type": "integer", "description": "First addend." },
                        "b": { "type": "integer", "description": "Second addend." }
                    },
                    "required": ["a", "b"]
                }),
            },
            ToolSpec {
                name: SEARCH_TOOL.to_string(),
                description:
                    "Use this tool to search and give details about the documents uploaded by the user."
                        .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Natural-language question to answer from the documents."
                        }
                    },
                    "required": ["query"]
                }),
            },
        ]
    }

    /// Execute one requested call and return the correlated tool-result message.
    pub async fn execute(
        &self,
        call: &ToolCallRequest,
        session: &SessionContext,
    ) -> Result<ChatMessage, ToolError> {
        tracing::debug!(tool = %call.name, call_id = %call.id, "Executing tool call");
        match call.name.as_str() {
            CALCULATOR_TOOL => {
                let a = require_integer(call, "a")?;
                let b = require_integer(call, "b")?;
                let sum = a.checked_add(b).ok_or_else(|| ToolError::InvalidArguments {
                    tool: call.name.clone(),
                    message: format!("{a} + {b} overflows"),
                })?;
                Ok(ChatMessage::tool_result(&call.id, sum.to_string()))
            }
            SEARCH_TOOL => {
                let query = require_string(call, "query")?;
                let outcome = self
                    .pipeline
                    .run(QueryContext {
                        collection: session.thread_id.clone(),
                        question: query,
                        selected_files: session.selected_files.clone(),
                        k: None,
                    })
                    .await?;
                Ok(ChatMessage::tool_result(&call.id, outcome.answer))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

fn require_integer(call: &ToolCallRequest, key: &str) -> Result<i64, ToolError> {
    argument(call, key)?
        .as_i64()
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: call.name.clone(),
            message: format!("'{key}' must be an integer"),
        })
}

fn require_string(call: &ToolCallRequest, key: &str) -> Result<String, ToolError> {
    argument(call, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: call.name.clone(),
            message: format!("'{key}' must be a string"),
        })
}

fn argument<'a>(call: &'a ToolCallRequest, key: &str) -> Result<&'a Value, ToolError> {
    call.arguments
        .get(key)
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: call.name.clone(),
            message: format!("missing '{key}'"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::FeatureHashEmbedder;
    use crate::llm::{ChatClient, ChatClientError, Role};
    use crate::qdrant::QdrantGateway;
    use async_trait::async_trait;
    use httpmock::{Method::POST, MockServer};
    use reqwest::Client;

    struct CannedChat;

    #[async_trait]
    impl ChatClient for CannedChat {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolSpec],
        ) -> Result<ChatMessage, ChatClientError> {
            Ok(ChatMessage::assistant("grounded answer"))
        }
    }

    fn tool_set(qdrant_url: String) -> ToolSet {
        let store = Arc::new(QdrantGateway {
            client: Client::builder()
                .user_agent("knowledgebot-test")
                .build()
                .expect("client"),
            base_url: qdrant_url,
            api_key: None,
        });
        let pipeline = RetrievalPipeline::new(
            Arc::new(FeatureHashEmbedder::new(8)),
            store,
            Arc::new(CannedChat),
            3,
        );
        ToolSet::new(Arc::new(pipeline))
    }

    fn session() -> SessionContext {
        SessionContext {
            thread_id: "t1".into(),
            selected_files: None,
        }
    }

    #[tokio::test]
    async fn calculator_sums_and_correlates() {
        let tools = tool_set("http://127.0.0.1:1".into());
        let result = tools
            .execute(
                &ToolCallRequest {
                    id: "call_9".into(),
                    name: CALCULATOR_TOOL.into(),
                    arguments: json!({"a": 2, "b": 3}),
                },
                &session(),
            )
            .await
            .expect("calculator");

        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.content, "5");
        assert_eq!(result.tool_call_id.as_deref(), Some("call_9"));
    }

    #[tokio::test]
    async fn calculator_rejects_non_integer_arguments() {
        let tools = tool_set("http://127.0.0.1:1".into());
        let error = tools
            .execute(
                &ToolCallRequest {
                    id: "call_9".into(),
                    name: CALCULATOR_TOOL.into(),
                    arguments: json!({"a": "two", "b": 3}),
                },
                &session(),
            )
            .await
            .expect_err("bad arguments");

        assert!(matches!(error, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn calculator_rejects_overflowing_sum() {
        let tools = tool_set("http://127.0.0.1:1".into());
        let error = tools
            .execute(
                &ToolCallRequest {
                    id: "call_9".into(),
                    name: CALCULATOR_TOOL.into(),
                    arguments: json!({"a": i64::MAX, "b": 1}),
                },
                &session(),
            )
            .await
            .expect_err("overflow");

        assert!(matches!(error, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_hard_failure() {
        let tools = tool_set("http://127.0.0.1:1".into());
        let error = tools
            .execute(
                &ToolCallRequest {
                    id: "call_9".into(),
                    name: "file_delete".into(),
                    arguments: json!({}),
                },
                &session(),
            )
            .await
            .expect_err("unknown tool");

        assert!(matches!(error, ToolError::UnknownTool(name) if name == "file_delete"));
    }

    #[tokio::test]
    async fn search_tool_uses_thread_id_as_namespace() {
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/t1/points/query");
                then.status(200).json_body(serde_json::json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": []
                }));
            })
            .await;

        let tools = tool_set(server.base_url());
        let result = tools
            .execute(
                &ToolCallRequest {
                    id: "call_3".into(),
                    name: SEARCH_TOOL.into(),
                    arguments: json!({"query": "what is in the report?"}),
                },
                &session(),
            )
            .await
            .expect("search tool");

        search.assert();
        assert_eq!(result.content, "grounded answer");
        assert_eq!(result.tool_call_id.as_deref(), Some("call_3"));
    }

    #[test]
    fn schemas_never_expose_session_parameters() {
        for spec in ToolSet::specs() {
            let properties = spec.parameters["properties"]
                .as_object()
                .expect("properties object");
            assert!(!properties.contains_key("thread_id"));
            assert!(!properties.contains_key("collection"));
            assert!(!properties.contains_key("selected_files"));
        }
    }
}
