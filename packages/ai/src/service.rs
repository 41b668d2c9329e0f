// ABOUTME: Completion service for OpenAI-compatible chat completions with tool calling
// ABOUTME: Handles API requests, response parsing and server-sent event streaming

use crate::types::{
    AssistantMessage, ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse,
    ChatMessage, StreamDelta, ToolDefinition,
};
use async_trait::async_trait;
use futures::stream::Stream;
use reqwest::{Client, Response};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

pub const OPENAI_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum AIServiceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("No API key configured")]
    NoApiKey,

    #[error("Invalid response format")]
    InvalidResponse,
}

pub type AIServiceResult<T> = Result<T, AIServiceError>;

pub type CompletionStream = Pin<Box<dyn Stream<Item = AIServiceResult<StreamDelta>> + Send>>;

/// A hosted completion endpoint. `tools: None` forbids tool calls for that request.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> AIServiceResult<AssistantMessage>;

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> AIServiceResult<CompletionStream>;
}

pub struct AIService {
    client: Client,
    api_key: Option<String>,
    model: String,
    completions_url: String,
}

impl AIService {
    /// Create HTTP client with timeout configuration
    fn create_client() -> AIServiceResult<Client> {
        Ok(Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()?)
    }

    pub fn new(api_key: Option<String>) -> AIServiceResult<Self> {
        if api_key.is_none() {
            info!("OPENAI_API_KEY not set - completion calls will fail until a key is configured");
        }

        Ok(Self {
            client: Self::create_client()?,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            completions_url: OPENAI_COMPLETIONS_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        if self.model != DEFAULT_MODEL {
            info!("Using custom completion model: {}", self.model);
        }
        self
    }

    pub fn with_completions_url(mut self, url: impl Into<String>) -> Self {
        self.completions_url = url.into();
        self
    }

    /// Get the model being used by this service
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        stream: bool,
    ) -> AIServiceResult<Response> {
        let api_key = self.api_key.as_ref().ok_or(AIServiceError::NoApiKey)?;

        let tools = tools.filter(|t| !t.is_empty());
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            tools,
            tool_choice: tools.map(|_| "auto"),
            stream: stream.then_some(true),
        };

        info!(
            "Making completion request: model={}, messages={}, tools={}, stream={}",
            self.model,
            messages.len(),
            tools.map(|t| t.len()).unwrap_or(0),
            stream
        );

        let response = self
            .client
            .post(&self.completions_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!("Completion request timed out after {:?}", REQUEST_TIMEOUT);
                    AIServiceError::ApiError(format!(
                        "Request timed out after {} seconds",
                        REQUEST_TIMEOUT.as_secs()
                    ))
                } else if e.is_connect() {
                    error!("Failed to connect to completion endpoint: {}", e);
                    AIServiceError::ApiError(format!("Connection failed: {}", e))
                } else {
                    error!("Completion request failed: {}", e);
                    AIServiceError::RequestFailed(e)
                }
            })?;

        debug!("Completion endpoint responded: status={}", response.status());

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Completion API error: {} - {}", status, error_text);
            return Err(AIServiceError::ApiError(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionClient for AIService {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> AIServiceResult<AssistantMessage> {
        let response = self.send(messages, tools, false).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AIServiceError::ParseError(e.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(AIServiceError::InvalidResponse)?;

        if let Some(usage) = &completion.usage {
            debug!(
                "Completion usage: prompt={}, completion={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(AssistantMessage {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            finish_reason: choice.finish_reason,
            usage: completion.usage,
        })
    }

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> AIServiceResult<CompletionStream> {
        let response = self.send(messages, tools, true).await?;

        let stream = async_stream::stream! {
            use futures::StreamExt;
            let mut byte_stream = response.bytes_stream();
            let mut buffer = SseBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                match chunk_result {
                    Ok(bytes) => {
                        buffer.push(&bytes);
                        while let Some(data) = buffer.next_data() {
                            match parse_sse_data(&data) {
                                SseEvent::Deltas(deltas) => {
                                    for delta in deltas {
                                        yield Ok(delta);
                                    }
                                }
                                SseEvent::Done => return,
                                SseEvent::Error(message) => {
                                    yield Err(AIServiceError::ApiError(message));
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(AIServiceError::RequestFailed(e));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Splits a server-sent event byte stream into `data:` payloads.
///
/// Bytes are buffered until an event is complete, so a multi-byte character
/// or a CRLF pair split across network chunks is decoded intact.
#[derive(Debug, Default)]
pub(crate) struct SseBuffer {
    buffer: Vec<u8>,
    last_was_cr: bool,
    pending: std::collections::VecDeque<String>,
}

impl SseBuffer {
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        // CRLF and lone CR both end a line
        for &byte in chunk {
            match byte {
                b'\r' => {
                    self.buffer.push(b'\n');
                    self.last_was_cr = true;
                }
                b'\n' if self.last_was_cr => self.last_was_cr = false,
                _ => {
                    self.buffer.push(byte);
                    self.last_was_cr = false;
                }
            }
        }

        while let Some(event_end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let event: Vec<u8> = self.buffer.drain(..event_end + 2).collect();
            let event = String::from_utf8_lossy(&event[..event_end]);

            let data: Vec<&str> = event
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|d| d.strip_prefix(' ').unwrap_or(d))
                .collect();
            if !data.is_empty() {
                self.pending.push_back(data.join("\n"));
            }
        }
    }

    pub(crate) fn next_data(&mut self) -> Option<String> {
        self.pending.pop_front()
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
    Deltas(Vec<StreamDelta>),
    Done,
    Error(String),
}

pub(crate) fn parse_sse_data(data: &str) -> SseEvent {
    if data.trim() == "[DONE]" {
        return SseEvent::Done;
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            debug!("Skipping unparseable stream event: {}", e);
            return SseEvent::Deltas(Vec::new());
        }
    };

    if let Some(message) = value.get("error").map(|err| {
        err["message"]
            .as_str()
            .unwrap_or("Unknown streaming error")
            .to_string()
    }) {
        return SseEvent::Error(message);
    }

    let chunk: ChatCompletionChunk = match serde_json::from_value(value) {
        Ok(c) => c,
        Err(e) => return SseEvent::Error(format!("Malformed stream chunk: {}", e)),
    };

    let mut deltas = Vec::new();
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            deltas.push(StreamDelta::Content(content));
        }
        for fragment in choice.delta.tool_calls.unwrap_or_default() {
            deltas.push(StreamDelta::ToolCall(fragment));
        }
    }
    SseEvent::Deltas(deltas)
}
