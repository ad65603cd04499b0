//! OpenAI-compatible chat-completion client.
//!
//! Talks to any endpoint implementing the `/chat/completions` contract,
//! including tool-call decoding. The wire format keeps tool-call arguments as
//! a JSON-encoded string, which this client parses eagerly so the rest of the
//! crate only ever sees structured values.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use super::types::{ChatMessage, Role, ToolCallRequest, ToolSpec};
use super::{ChatClient, ChatClientError};

/// HTTP client for OpenAI-compatible chat-completion endpoints.
pub struct OpenAiChatClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) model: String,
}

impl OpenAiChatClient {
    /// Construct a client for the given endpoint and model.
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        let http = Client::builder()
            .user_agent("knowledgebot/0.1")
            .build()
            .expect("Failed to construct reqwest::Client for chat completions");
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn wire_message(message: &ChatMessage) -> Value {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        let mut body = json!({
            "role": role,
            "content": message.content,
        });
        let obj = body.as_object_mut().expect("message body is an object");
        if !message.tool_calls.is_empty() {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            obj.insert("tool_calls".into(), Value::Array(calls));
        }
        if let Some(id) = &message.tool_call_id {
            obj.insert("tool_call_id".into(), Value::String(id.clone()));
        }
        body
    }

    fn wire_tools(tools: &[ToolSpec]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatMessage, ChatClientError> {
        let mut payload = json!({
            "model": self.model,
            "messages": messages.iter().map(Self::wire_message).collect::<Vec<_>>(),
        });
        if !tools.is_empty() {
            payload
                .as_object_mut()
                .expect("payload is an object")
                .insert("tools".into(), Value::Array(Self::wire_tools(tools)));
        }

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "Requesting chat completion"
        );

        let mut request = self.http.post(self.endpoint()).json(&payload);
        if let Some(key) = &self.api_key
            && !key.is_empty()
        {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|error| {
            ChatClientError::ProviderUnavailable(format!(
                "failed to reach chat endpoint at {}: {error}",
                self.base_url
            ))
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ChatClientError::ProviderUnavailable(format!(
                "chat endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatClientError::CompletionFailed(format!(
                "chat endpoint returned {status}: {body}"
            )));
        }

        let body: CompletionResponse = response.json().await.map_err(|error| {
            ChatClientError::InvalidResponse(format!("failed to decode completion: {error}"))
        })?;

        let message = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| {
                ChatClientError::InvalidResponse("completion contained no choices".into())
            })?;

        let calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments: Value =
                    serde_json::from_str(&call.function.arguments).map_err(|error| {
                        ChatClientError::InvalidResponse(format!(
                            "tool call '{}' carried malformed arguments: {error}",
                            call.function.name
                        ))
                    })?;
                Ok(ToolCallRequest {
                    id: call.id,
                    name: call.function.name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>, ChatClientError>>()?;

        let content = message.content.unwrap_or_default();
        Ok(if calls.is_empty() {
            ChatMessage::assistant(content)
        } else {
            ChatMessage::assistant_with_calls(content, calls)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn test_client(base_url: String) -> OpenAiChatClient {
        OpenAiChatClient {
            http: Client::builder()
                .user_agent("knowledgebot-test")
                .build()
                .expect("client"),
            base_url,
            api_key: None,
            model: "test-model".into(),
        }
    }

    #[tokio::test]
    async fn decodes_plain_answer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "Paris." } }
                    ]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let reply = client
            .complete(&[ChatMessage::user("Capital of France?")], &[])
            .await
            .expect("completion");

        mock.assert();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Paris.");
        assert!(reply.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn decodes_tool_calls_with_parsed_arguments() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [
                        {
                            "message": {
                                "role": "assistant",
                                "content": null,
                                "tool_calls": [
                                    {
                                        "id": "call_abc",
                                        "type": "function",
                                        "function": {
                                            "name": "calculator",
                                            "arguments": "{\"a\": 2, \"b\": 3}"
                                        }
                                    }
                                ]
                            }
                        }
                    ]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let reply = client
            .complete(&[ChatMessage::user("2+3?")], &[])
            .await
            .expect("completion");

        assert_eq!(reply.tool_calls.len(), 1);
        let call = &reply.tool_calls[0];
        assert_eq!(call.id, "call_abc");
        assert_eq!(call.name, "calculator");
        assert_eq!(call.arguments, json!({"a": 2, "b": 3}));
    }

    #[tokio::test]
    async fn surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(500).body("boom");
            })
            .await;

        let client = test_client(server.base_url());
        let error = client
            .complete(&[ChatMessage::user("q")], &[])
            .await
            .expect_err("error status");

        assert!(matches!(error, ChatClientError::CompletionFailed(message) if message.contains("500")));
    }

    #[tokio::test]
    async fn rejects_malformed_tool_arguments() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [
                        {
                            "message": {
                                "role": "assistant",
                                "tool_calls": [
                                    {
                                        "id": "call_bad",
                                        "type": "function",
                                        "function": { "name": "calculator", "arguments": "{not json" }
                                    }
                                ]
                            }
                        }
                    ]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = client
            .complete(&[ChatMessage::user("q")], &[])
            .await
            .expect_err("malformed arguments");

        assert!(matches!(error, ChatClientError::InvalidResponse(_)));
    }
}
