//! Chat provider trait.
//!
//! Both wire families (OpenAI-compatible SSE and the Ollama-style NDJSON
//! chat endpoint) implement [`ChatProvider`]; the orchestrator only sees the
//! stream of [`StreamChunk`]s.

use tokio::sync::mpsc;

use crate::BoxFuture;

use super::types::{ChatRequest, StreamChunk};

/// Receiving half of a provider stream.
pub type ChunkReceiver = mpsc::Receiver<Result<StreamChunk, LlmError>>;

/// Errors from provider calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed (check API key): {0}")]
    Auth(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider error: HTTP {status}: {message}")]
    ProviderError { status: u16, message: String },

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("request timed out")]
    Timeout,
}

impl LlmError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// A streaming chat backend.
///
/// `chat_stream` resolves once the response headers arrived; chunks then flow
/// through the returned channel. Dropping the receiver aborts the connection.
pub trait ChatProvider: Send + Sync {
    /// Display name used in logs.
    fn name(&self) -> &str;

    fn chat_stream(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChunkReceiver, LlmError>>;
}
