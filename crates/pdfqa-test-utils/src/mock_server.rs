//! Local HTTP server imitating chat providers.
//!
//! [`MockProvider`] binds an ephemeral port and answers
//! `/v1/chat/completions`, `/chat/completions` and `/api/chat` with a scripted
//! streaming body, recording every request it receives.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use futures_util::stream;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the mock answers with.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    content_type: &'static str,
    lines: Vec<String>,
    line_delay: Duration,
    retry_after: Option<u64>,
    hang: bool,
}

impl MockResponse {
    /// OpenAI-style SSE: one `data:` event per chunk, then `data: [DONE]`.
    pub fn openai_sse<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines: Vec<String> = chunks
            .into_iter()
            .map(|chunk| {
                let event = json!({
                    "id": "chatcmpl-mock",
                    "object": "chat.completion.chunk",
                    "choices": [{"index": 0, "delta": {"content": chunk.as_ref()}}],
                });
                format!("data: {event}\n\n")
            })
            .collect();
        lines.push("data: [DONE]\n\n".to_string());
        Self::raw("text/event-stream", lines)
    }

    /// Ollama-style NDJSON: one object per chunk, then `"done": true`.
    pub fn ollama_ndjson<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines: Vec<String> = chunks
            .into_iter()
            .map(|chunk| {
                let object = json!({
                    "model": "mock",
                    "message": {"role": "assistant", "content": chunk.as_ref()},
                    "done": false,
                });
                format!("{object}\n")
            })
            .collect();
        let last = json!({
            "model": "mock",
            "message": {"role": "assistant", "content": ""},
            "done": true,
        });
        lines.push(format!("{last}\n"));
        Self::raw("application/x-ndjson", lines)
    }

    /// Send `lines` verbatim with status 200.
    pub fn raw(content_type: &'static str, lines: Vec<String>) -> Self {
        Self {
            status: 200,
            content_type,
            lines,
            line_delay: Duration::ZERO,
            retry_after: None,
            hang: false,
        }
    }

    /// A non-streaming error reply.
    pub fn error(status: u16, body: &str) -> Self {
        Self {
            status,
            ..Self::raw("application/json", vec![body.to_string()])
        }
    }

    pub fn with_line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = delay;
        self
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    /// Keep the connection open after the last line.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }
}

/// A request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

struct MockState {
    response: MockResponse,
    requests: Mutex<Vec<RecordedRequest>>,
    body_dropped: Arc<AtomicBool>,
}

/// A running mock provider; stops when dropped.
pub struct MockProvider {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockProvider {
    pub async fn start(response: MockResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock provider");
        let addr = listener.local_addr().expect("mock provider has an address");

        let state = Arc::new(MockState {
            response,
            requests: Mutex::new(Vec::new()),
            body_dropped: Arc::new(AtomicBool::new(false)),
        });
        let app = axum::Router::new()
            .route("/v1/chat/completions", post(handle_chat))
            .route("/chat/completions", post(handle_chat))
            .route("/api/chat", post(handle_chat))
            .with_state(Arc::clone(&state));

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Whether a client went away before a response body was complete.
    pub fn body_dropped(&self) -> bool {
        self.state.body_dropped.load(Ordering::SeqCst)
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct BodyState {
    lines: VecDeque<String>,
    delay: Duration,
    hang: bool,
    finished: bool,
    dropped: Arc<AtomicBool>,
}

impl Drop for BodyState {
    fn drop(&mut self) {
        if !self.finished {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }
}

async fn handle_chat(
    State(state): State<Arc<MockState>>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(recorded);
    }

    let response = &state.response;
    let body_state = BodyState {
        lines: response.lines.iter().cloned().collect(),
        delay: response.line_delay,
        hang: response.hang,
        finished: false,
        dropped: Arc::clone(&state.body_dropped),
    };
    let body = stream::unfold(body_state, |mut st| async move {
        if let Some(line) = st.lines.pop_front() {
            if !st.delay.is_zero() {
                tokio::time::sleep(st.delay).await;
            }
            return Some((Ok::<_, std::io::Error>(line), st));
        }
        if st.hang {
            std::future::pending::<()>().await;
        }
        st.finished = true;
        None
    });

    let mut builder = Response::builder()
        .status(response.status)
        .header(header::CONTENT_TYPE, response.content_type);
    if let Some(secs) = response.retry_after {
        builder = builder.header(header::RETRY_AFTER, secs.to_string());
    }
    builder
        .body(Body::from_stream(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
