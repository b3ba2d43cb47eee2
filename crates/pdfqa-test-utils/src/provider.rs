//! In-memory chat provider driven by a script.
//!
//! [`ScriptedProvider`] replays a fixed sequence of [`Step`]s for every
//! request and records what it was asked, so orchestrator tests run without
//! any network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pdfqa_core::BoxFuture;
use pdfqa_core::llm::{ChatProvider, ChatRequest, ChunkReceiver, LlmError, StreamChunk};
use tokio::sync::mpsc;

/// One scripted action.
#[derive(Debug, Clone)]
pub enum Step {
    /// Emit answer text.
    Chunk(String),
    /// Pause before the next step.
    Delay(Duration),
    /// Emit an error and stop.
    Error(LlmError),
    /// Keep the stream open without sending anything until it is dropped.
    Hang,
}

#[derive(Debug, Default)]
struct Shared {
    requests: Mutex<Vec<ChatRequest>>,
    stream_dropped: AtomicBool,
}

/// Chat provider that replays a script.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    steps: Vec<Step>,
    connect_error: Option<LlmError>,
    connect_delay: Duration,
    send_done: bool,
    shared: Arc<Shared>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            connect_error: None,
            connect_delay: Duration::ZERO,
            send_done: true,
            shared: Arc::default(),
        }
    }

    /// Answer with `chunks`, back to back.
    pub fn answering<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        chunks.into_iter().fold(Self::new(), |p, c| p.chunk(c))
    }

    pub fn chunk(mut self, text: impl Into<String>) -> Self {
        self.steps.push(Step::Chunk(text.into()));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.steps.push(Step::Delay(delay));
        self
    }

    pub fn error(mut self, err: LlmError) -> Self {
        self.steps.push(Step::Error(err));
        self
    }

    pub fn hang(mut self) -> Self {
        self.steps.push(Step::Hang);
        self
    }

    /// Close the stream without the end-of-stream chunk.
    pub fn without_done(mut self) -> Self {
        self.send_done = false;
        self
    }

    /// Fail every request before any stream is opened.
    pub fn fail_connect(mut self, err: LlmError) -> Self {
        self.connect_error = Some(err);
        self
    }

    /// Wait this long before handing back the stream, like a server that
    /// is slow to send response headers.
    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.shared
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Whether the consumer dropped a stream before the script finished.
    pub fn stream_dropped(&self) -> bool {
        self.shared.stream_dropped.load(Ordering::SeqCst)
    }
}

impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn chat_stream(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChunkReceiver, LlmError>> {
        if let Ok(mut requests) = self.shared.requests.lock() {
            requests.push(request.clone());
        }
        let steps = self.steps.clone();
        let send_done = self.send_done;
        let shared = Arc::clone(&self.shared);
        let connect_error = self.connect_error.clone();
        let connect_delay = self.connect_delay;

        Box::pin(async move {
            if !connect_delay.is_zero() {
                tokio::time::sleep(connect_delay).await;
            }
            if let Some(err) = connect_error {
                return Err(err);
            }

            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(async move {
                let dropped = || shared.stream_dropped.store(true, Ordering::SeqCst);
                for step in steps {
                    match step {
                        Step::Chunk(text) => {
                            if tx.send(Ok(StreamChunk::Text(text))).await.is_err() {
                                dropped();
                                return;
                            }
                        }
                        Step::Delay(delay) => {
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => {}
                                _ = tx.closed() => {
                                    dropped();
                                    return;
                                }
                            }
                        }
                        Step::Error(err) => {
                            let _ = tx.send(Err(err)).await;
                            return;
                        }
                        Step::Hang => {
                            tx.closed().await;
                            dropped();
                            return;
                        }
                    }
                }
                if send_done && tx.send(Ok(StreamChunk::Done)).await.is_err() {
                    dropped();
                }
            });
            Ok(rx)
        })
    }
}
