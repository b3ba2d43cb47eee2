//! Ollama-style streaming provider.
//!
//! `POST {host}/api/chat` answers with newline-delimited JSON objects, each
//! carrying `message.content`; the last one has `"done": true`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::BoxFuture;

use super::provider::{ChatProvider, ChunkReceiver, LlmError};
use super::stream::{self, LineOutcome, STREAM_BUFFER};
use super::types::{ChatMessage, ChatRequest};

/// Streaming client for the Ollama chat endpoint.
#[derive(Debug)]
pub struct OllamaProvider {
    client: Client,
    endpoint: String,
}

impl OllamaProvider {
    /// Create a provider posting to the full chat URL `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Decode one line of an Ollama chat stream.
pub(crate) fn decode_line(line: &str) -> LineOutcome {
    let line = line.trim();
    // Some proxies re-frame the stream as SSE.
    let data = line.strip_prefix("data:").map_or(line, str::trim);
    if data.is_empty() {
        return LineOutcome::Skip;
    }

    let chunk: OllamaChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return LineOutcome::Malformed(e.to_string()),
    };

    if let Some(error) = chunk.error {
        return LineOutcome::Failed(LlmError::Protocol(error));
    }

    let text = chunk.message.map(|m| m.content).unwrap_or_default();
    match (text.is_empty(), chunk.done) {
        (true, true) => LineOutcome::Done,
        (true, false) => LineOutcome::Skip,
        (false, done) => LineOutcome::Delta { text, done },
    }
}

impl ChatProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    fn chat_stream(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChunkReceiver, LlmError>> {
        let body = serde_json::to_value(OllamaRequest {
            model: &request.model,
            messages: &request.messages,
            stream: true,
        })
        .map_err(|e| LlmError::Parse(e.to_string()));
        Box::pin(async move {
            let body = body?;
            debug!(endpoint = %self.endpoint, model = %body["model"], "Ollama stream request");

            let response = self
                .client
                .post(&self.endpoint)
                .json(&body)
                .send()
                .await
                .map_err(LlmError::from_reqwest)?;
            let response = stream::check_status(response).await?;

            let (tx, rx) = mpsc::channel(STREAM_BUFFER);
            tokio::spawn(stream::pump(response, tx, "ollama", decode_line));
            Ok(rx)
        })
    }
}

// ── Wire types (private) ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content() {
        let line = r#"{"model":"llama3","message":{"role":"assistant","content":"Hi"},"done":false}"#;
        assert_eq!(
            decode_line(line),
            LineOutcome::Delta {
                text: "Hi".to_string(),
                done: false
            }
        );
    }

    #[test]
    fn test_decode_final_object() {
        let line = r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"total_duration":123}"#;
        assert_eq!(decode_line(line), LineOutcome::Done);

        let line = r#"{"message":{"content":"end."},"done":true}"#;
        assert_eq!(
            decode_line(line),
            LineOutcome::Delta {
                text: "end.".to_string(),
                done: true
            }
        );
    }

    #[test]
    fn test_decode_sse_framed() {
        assert_eq!(
            decode_line(r#"data: {"message":{"content":"x"},"done":false}"#),
            LineOutcome::Delta {
                text: "x".to_string(),
                done: false
            }
        );
    }

    #[test]
    fn test_decode_error_and_garbage() {
        assert_eq!(
            decode_line(r#"{"error":"model 'llama9' not found"}"#),
            LineOutcome::Failed(LlmError::Protocol("model 'llama9' not found".to_string()))
        );
        assert!(matches!(decode_line("<html>"), LineOutcome::Malformed(_)));
        assert_eq!(decode_line("   "), LineOutcome::Skip);
    }
}
