//! OpenAI-compatible client implementation
//!
//! Async HTTP client for `/chat/completions` (tool calling and SSE streaming),
//! `/embeddings` and `/responses`. Any server speaking the same wire format
//! works by pointing `openai.base_url` at it.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::core::{
    generate_call_id, Config, Message, RagentError, Result, Role, ToolCall, ToolDefinition,
};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, StreamCallback, TokenUsage};

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Chat completions request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
}

/// Message as it travels on the wire
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool call format; arguments are a JSON-encoded string
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunction,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Chat completions response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Streaming chunk (`data:` line payload)
#[derive(Debug, Deserialize)]
struct StreamChunkResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Embeddings response
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Splits a byte stream into text lines.
///
/// Bytes are only decoded once a full line has arrived, so a multi-byte
/// character split across network chunks stays intact.
#[derive(Debug, Default)]
struct SseLines {
    buffer: Vec<u8>,
}

impl SseLines {
    /// Append bytes and return every line completed by them
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }

    /// Whatever is left once the stream has ended
    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

/// Accumulates streamed deltas into one response
struct StreamCollector {
    content: String,
    model: String,
    usage: Option<TokenUsage>,
}

impl StreamCollector {
    fn new(model: &str) -> Self {
        Self {
            content: String::new(),
            model: model.to_string(),
            usage: None,
        }
    }

    /// Handle one SSE line; returns true at `[DONE]`
    fn apply(&mut self, line: &str, on_token: &StreamCallback) -> bool {
        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
            return false;
        };

        if data == "[DONE]" {
            return true;
        }

        match serde_json::from_str::<StreamChunkResponse>(data) {
            Ok(chunk) => {
                if !chunk.model.is_empty() {
                    self.model = chunk.model;
                }
                if let Some(u) = chunk.usage {
                    self.usage = Some(TokenUsage::from(u));
                }
                for choice in chunk.choices {
                    if let Some(token) = choice.delta.content.filter(|t| !t.is_empty()) {
                        on_token(&token);
                        self.content.push_str(&token);
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, line = data, "skipping unparsable stream chunk");
            }
        }
        false
    }

    fn into_response(self) -> LLMResponse {
        LLMResponse {
            content: self.content,
            tool_calls: Vec::new(),
            usage: self.usage,
            model: self.model,
        }
    }
}

impl OpenAiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.openai.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            api_key: config.openai.api_key.clone(),
        })
    }

    /// Create a client with custom base URL
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_key)
        }
    }

    /// POST a JSON body and return the successful response
    async fn send<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .authorized(self.client.post(self.endpoint(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RagentError::llm(format!(
                        "Cannot connect to model API at {}. Is it reachable?",
                        self.base_url
                    ))
                } else {
                    RagentError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagentError::llm(format!(
                "Model API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    /// POST a JSON body to any endpoint under the base URL and decode JSON
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self.send(path, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| RagentError::llm(format!("Failed to parse response: {}", e)))
    }

    /// Embed a single input string
    pub async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({ "model": model, "input": input });
        let response = self.send("embeddings", &body).await?;
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagentError::llm(format!("Failed to parse embedding: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagentError::llm("Embedding response contained no data"))
    }

    fn to_wire_message(msg: &Message) -> WireMessage {
        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|tc| WireToolCall {
                    id: Some(tc.id.clone()),
                    call_type: function_type(),
                    function: WireFunction {
                        name: tc.name.clone(),
                        arguments: tc.arguments.to_string(),
                    },
                })
                .collect::<Vec<_>>()
        });

        // Assistant turns that only carry tool calls go out with null content
        let content = if msg.content.is_empty() && tool_calls.is_some() {
            None
        } else {
            Some(msg.content.clone())
        };

        WireMessage {
            role: msg.role,
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn from_wire_tool_call(tc: WireToolCall) -> ToolCall {
        let arguments = if tc.function.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&tc.function.arguments)
                .unwrap_or(Value::String(tc.function.arguments))
        };

        ToolCall {
            id: tc.id.filter(|id| !id.is_empty()).unwrap_or_else(generate_call_id),
            name: tc.function.name,
            arguments,
        }
    }

    fn to_llm_response(response: ChatResponse) -> Result<LLMResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagentError::llm("Response contained no choices"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(Self::from_wire_tool_call)
            .collect();

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: response.usage.map(TokenUsage::from),
            model: response.model,
        })
    }

    fn build_request<'a>(
        model: &'a str,
        messages: &[Message],
        tools: Option<&'a [ToolDefinition]>,
        options: Option<GenerateOptions>,
        stream: bool,
    ) -> ChatRequest<'a> {
        let options = options.unwrap_or_default();
        ChatRequest {
            model,
            messages: messages.iter().map(Self::to_wire_message).collect(),
            tools: tools.filter(|t| !t.is_empty()),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stop: options.stop,
            stream,
        }
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<LLMResponse> {
        tracing::debug!(
            model = request.model,
            messages = request.messages.len(),
            tools = request.tools.map(|t| t.len()).unwrap_or(0),
            "chat completion request"
        );

        let response = self.send("chat/completions", request).await?;
        let response_text = response.text().await?;

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagentError::llm(format!("Failed to parse response: {}", e)))?;

        Self::to_llm_response(chat_response)
    }
}

impl From<WireUsage> for TokenUsage {
    fn from(usage: WireUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAiClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let request = Self::build_request(model, messages, None, options, false);
        self.complete(&request).await
    }

    async fn chat_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let request = Self::build_request(model, messages, Some(tools), options, false);
        self.complete(&request).await
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
        on_token: StreamCallback,
    ) -> Result<LLMResponse> {
        let request = Self::build_request(model, messages, None, options, true);
        let response = self.send("chat/completions", &request).await?;

        let mut collected = StreamCollector::new(model);
        let mut lines = SseLines::default();
        let mut stream = response.bytes_stream();

        let mut done = false;

        'read: while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| RagentError::llm(format!("Stream error: {}", e)))?;
            for line in lines.push(&chunk) {
                if collected.apply(&line, &on_token) {
                    done = true;
                    break 'read;
                }
            }
        }

        // A last event without a trailing newline still counts
        if !done {
            if let Some(line) = lines.finish() {
                collected.apply(&line, &on_token);
            }
        }

        Ok(collected.into_response())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
