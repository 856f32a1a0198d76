//! Ollama client — the single point of entry for all model calls in the API.
//!
//! Two kinds of calls exist: non-streaming "module" calls (query generation,
//! structured extraction, follow-up questions) pinned to temperature 0.0, and
//! the streaming chat call (NDJSON chunks over `/api/chat`) used for the
//! user-facing reply. Embeddings go through `/api/embeddings`.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const CHAT_TEMPERATURE: f64 = 0.4;
const MODULE_TEMPERATURE: f64 = 0.0;
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Role of a chat message, serialized in Ollama's wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// A function descriptor registered with the model, in Ollama's
/// `{type: "function", function: {name, description, parameters}}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescriptor {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            kind: "function".to_string(),
            function: ToolFunction {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// One streamed chunk of a chat reply.
#[derive(Debug, Clone)]
pub struct ChatChunk {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub done: bool,
}

pub type ChatStream = BoxStream<'static, Result<ChatChunk, LlmError>>;

/// Chat-capable model. Implemented by [`OllamaClient`] in production and by
/// scripted stubs in tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One-shot call with a system prompt, pinned to low temperature.
    /// Used by internal module steps, never by the user-facing chat.
    async fn call(&self, system: &str, user: &str) -> Result<String, LlmError>;

    /// Streaming conversation call with tool descriptors registered.
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<ChatStream, LlmError>;
}

/// Text embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

/// Calls the model and deserializes the reply as JSON, stripping markdown
/// code fences the model may wrap it in.
pub async fn call_json<T: DeserializeOwned>(
    model: &dyn ChatModel,
    system: &str,
    user: &str,
) -> Result<T, LlmError> {
    let text = model.call(system, user).await?;
    let text = strip_json_fences(&text);
    if text.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    serde_json::from_str(text).map_err(LlmError::Parse)
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDescriptor],
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaChatMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// HTTP client for a locally hosted Ollama instance.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, embedding_model: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            model,
            embedding_model,
        }
    }

    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
        stream: bool,
        temperature: f64,
    ) -> Result<reqwest::Response, LlmError> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages,
            stream,
            tools,
            options: OllamaOptions { temperature },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn call(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let messages = [ChatMessage::system(system), ChatMessage::user(user)];
        let response = self
            .send_chat(&messages, &[], false, MODULE_TEMPERATURE)
            .await?;

        let parsed: OllamaChatResponse = response.json().await?;
        let content = parsed
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyContent)?;

        debug!("module call returned {} chars", content.len());
        Ok(content)
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<ChatStream, LlmError> {
        let response = self
            .send_chat(messages, tools, true, CHAT_TEMPERATURE)
            .await?;

        // Ollama streams NDJSON: one JSON object per line, `done: true` last.
        let stream = futures_util::stream::unfold(
            (response.bytes_stream(), Vec::<u8>::new()),
            |(mut body, mut buf)| async move {
                loop {
                    if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buf.drain(..=pos).collect();
                        let line = String::from_utf8_lossy(&line);
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        let chunk = parse_chunk(line);
                        return Some((chunk, (body, buf)));
                    }

                    match body.next().await {
                        Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                        Some(Err(e)) => return Some((Err(LlmError::Http(e)), (body, buf))),
                        None => {
                            if buf.is_empty() {
                                return None;
                            }
                            let line = String::from_utf8_lossy(&buf).trim().to_string();
                            buf.clear();
                            if line.is_empty() {
                                return None;
                            }
                            return Some((parse_chunk(&line), (body, buf)));
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = OllamaEmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OllamaEmbeddingResponse = response.json().await?;
        Ok(parsed.embedding)
    }
}

fn parse_chunk(line: &str) -> Result<ChatChunk, LlmError> {
    let parsed: OllamaChatResponse = serde_json::from_str(line)?;
    let (content, tool_calls) = match parsed.message {
        Some(m) => (m.content, m.tool_calls),
        None => (String::new(), Vec::new()),
    };
    Ok(ChatChunk {
        content,
        tool_calls,
        done: parsed.done,
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_chunk_with_content() {
        let line = r#"{"message":{"role":"assistant","content":"При"},"done":false}"#;
        let chunk = parse_chunk(line).unwrap();
        assert_eq!(chunk.content, "При");
        assert!(chunk.tool_calls.is_empty());
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_chunk_with_tool_call() {
        let line = r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"fetch_vacancies","arguments":{"stack":"Rust"}}}]},"done":false}"#;
        let chunk = parse_chunk(line).unwrap();
        assert_eq!(chunk.tool_calls.len(), 1);
        assert_eq!(chunk.tool_calls[0].function.name, "fetch_vacancies");
        assert_eq!(chunk.tool_calls[0].function.arguments["stack"], "Rust");
    }

    #[test]
    fn test_tool_calls_omitted_from_serialized_message() {
        let msg = ChatMessage::user("привет");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("tool_calls"));
    }
}
