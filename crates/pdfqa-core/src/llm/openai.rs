//! OpenAI-compatible streaming provider.
//!
//! Used for SiliconFlow and for self-hosted endpoints exposing
//! `/v1/chat/completions`. The response is server-sent events: `data: {json}`
//! lines carrying `choices[0].delta.content`, terminated by `data: [DONE]`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use zeroize::Zeroizing;

use crate::BoxFuture;

use super::provider::{ChatProvider, ChunkReceiver, LlmError};
use super::stream::{self, LineOutcome, STREAM_BUFFER};
use super::types::{ChatMessage, ChatRequest};

/// Streaming client for OpenAI-compatible chat-completions endpoints.
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    api_key: Option<Zeroizing<String>>,
    temperature: Option<f32>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider posting to the full chat-completions URL `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
            temperature: None,
        }
    }

    /// Send `Authorization: Bearer <key>`.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Zeroizing::new(key.into()));
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request_body<'a>(&self, request: &'a ChatRequest) -> OpenAiRequest<'a> {
        OpenAiRequest {
            model: &request.model,
            messages: &request.messages,
            stream: true,
            temperature: self.temperature,
        }
    }
}

/// Decode one SSE line of an OpenAI-compatible stream.
pub(crate) fn decode_line(line: &str) -> LineOutcome {
    let line = line.trim();
    // Blank separators, `: keep-alive` comments, `event:`/`id:` fields.
    let Some(data) = line.strip_prefix("data:") else {
        return LineOutcome::Skip;
    };
    let data = data.trim();
    if data.is_empty() {
        return LineOutcome::Skip;
    }
    if data == "[DONE]" {
        return LineOutcome::Done;
    }

    let chunk: OpenAiStreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return LineOutcome::Malformed(e.to_string()),
    };

    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| error.as_str())
            .map_or_else(|| error.to_string(), str::to_string);
        return LineOutcome::Failed(LlmError::Protocol(message));
    }

    match chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
    {
        Some(text) if !text.is_empty() => LineOutcome::Delta { text, done: false },
        _ => LineOutcome::Skip,
    }
}

impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI-compatible"
    }

    fn chat_stream(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChunkReceiver, LlmError>> {
        let body = serde_json::to_value(self.build_request_body(request))
            .map_err(|e| LlmError::Parse(e.to_string()));
        Box::pin(async move {
            let body = body?;
            debug!(endpoint = %self.endpoint, model = %body["model"], "OpenAI-compatible stream request");

            let mut builder = self
                .client
                .post(&self.endpoint)
                .header("content-type", "application/json")
                .header("accept", "text/event-stream")
                .json(&body);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key.as_str());
            }

            let response = builder.send().await.map_err(LlmError::from_reqwest)?;
            let response = stream::check_status(response).await?;

            let (tx, rx) = mpsc::channel(STREAM_BUFFER);
            tokio::spawn(stream::pump(response, tx, "openai", decode_line));
            Ok(rx)
        })
    }
}

// ── Wire types (private) ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    delta: OpenAiDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}
