//! Runs streaming exchanges, one at a time.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use pdfqa_config::{AppConfig, ExchangeConfig};

use super::callbacks::ExchangeCallbacks;
use super::cancel::CancelToken;
use super::{ExchangeError, ExchangeState, TimeoutKind};
use crate::context::ContextPlanner;
use crate::history::ConversationTurn;
use crate::llm::{self, ChatProvider, ChatRequest, StreamChunk};

/// How an exchange ended, returned by [`ChatOrchestrator::wait`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub id: u64,
    pub state: ExchangeState,
    /// Answer text forwarded before the exchange ended.
    pub answer: String,
    pub error: Option<ExchangeError>,
}

struct ActiveExchange {
    id: u64,
    cancel: CancelToken,
    handle: JoinHandle<ExchangeOutcome>,
}

/// Drives question-answering exchanges against one provider.
///
/// Only one exchange runs at a time; starting another cancels the running one
/// first. History is not touched here: callers record a turn once
/// [`wait`](Self::wait) reports [`ExchangeState::Completed`].
pub struct ChatOrchestrator {
    provider: Option<Arc<dyn ChatProvider>>,
    planner: Arc<ContextPlanner>,
    settings: ExchangeConfig,
    state: Arc<watch::Sender<ExchangeState>>,
    active: Option<ActiveExchange>,
    next_id: u64,
}

impl ChatOrchestrator {
    /// `provider` is `None` when the QA engine is disabled.
    pub fn new(
        provider: Option<Arc<dyn ChatProvider>>,
        planner: ContextPlanner,
        settings: ExchangeConfig,
    ) -> Self {
        let (state, _rx) = watch::channel(ExchangeState::Idle);
        Self {
            provider,
            planner: Arc::new(planner),
            settings,
            state: Arc::new(state),
            active: None,
            next_id: 0,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            llm::create_provider(&config.qa),
            ContextPlanner::from_config(config),
            config.exchange.clone(),
        )
    }

    pub fn planner(&self) -> &ContextPlanner {
        &self.planner
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn state(&self) -> ExchangeState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ExchangeState> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Start answering `question` about `document`.
    ///
    /// `history` is a snapshot of the earlier turns. Returns the exchange id;
    /// fails immediately (and reports through `on_failed`) when the engine
    /// is disabled.
    pub async fn start(
        &mut self,
        question: impl Into<String>,
        document: Arc<str>,
        history: Vec<ConversationTurn>,
        callbacks: Arc<dyn ExchangeCallbacks>,
    ) -> Result<u64, ExchangeError> {
        self.stop_active().await;

        let Some(provider) = self.provider.clone() else {
            warn!("question asked while the QA engine is disabled");
            let err = ExchangeError::Disabled;
            self.state.send_replace(ExchangeState::Failed);
            callbacks.on_failed(&err.to_string());
            return Err(err);
        };

        self.next_id += 1;
        let id = self.next_id;
        let question = question.into();
        info!(
            id,
            provider = provider.name(),
            question_chars = question.chars().count(),
            history = history.len(),
            "exchange started"
        );

        let cancel = CancelToken::new();
        let worker = Worker {
            id,
            provider,
            planner: Arc::clone(&self.planner),
            settings: self.settings.clone(),
            state: Arc::clone(&self.state),
            cancel: cancel.clone(),
            callbacks,
            question,
            document,
            history,
        };

        self.state.send_replace(ExchangeState::Building);
        let handle = tokio::spawn(worker.run());
        self.active = Some(ActiveExchange { id, cancel, handle });
        Ok(id)
    }

    /// Ask the running exchange to stop. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        match &self.active {
            Some(active) if !active.handle.is_finished() => {
                info!(id = active.id, "exchange cancellation requested");
                active.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait for the current exchange to end.
    pub async fn wait(&mut self) -> Option<ExchangeOutcome> {
        let active = self.active.take()?;
        Some(self.join(active).await)
    }

    async fn join(&self, active: ActiveExchange) -> ExchangeOutcome {
        match active.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(id = active.id, error = %err, "exchange task ended abnormally");
                self.state.send_replace(ExchangeState::Cancelled);
                ExchangeOutcome {
                    id: active.id,
                    state: ExchangeState::Cancelled,
                    answer: String::new(),
                    error: None,
                }
            }
        }
    }

    /// Cancel the running exchange and give it the grace period to finish
    /// before aborting its task.
    async fn stop_active(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if active.handle.is_finished() {
            return;
        }

        info!(id = active.id, "stopping running exchange");
        active.cancel.cancel();
        let grace = self.settings.cancel_grace();
        if tokio::time::timeout(grace, &mut active.handle).await.is_err() {
            warn!(
                id = active.id,
                grace_ms = grace.as_millis() as u64,
                "exchange did not stop within the grace period, aborting"
            );
            active.handle.abort();
            self.state.send_replace(ExchangeState::Cancelled);
        }
    }
}

impl Drop for ChatOrchestrator {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            active.handle.abort();
        }
    }
}

enum Stop {
    Cancelled,
    Failed(ExchangeError),
}

struct Worker {
    id: u64,
    provider: Arc<dyn ChatProvider>,
    planner: Arc<ContextPlanner>,
    settings: ExchangeConfig,
    state: Arc<watch::Sender<ExchangeState>>,
    cancel: CancelToken,
    callbacks: Arc<dyn ExchangeCallbacks>,
    question: String,
    document: Arc<str>,
    history: Vec<ConversationTurn>,
}

impl Worker {
    async fn run(self) -> ExchangeOutcome {
        let started = Instant::now();
        let mut answer = String::new();

        let (state, error) = match self.exchange(started, &mut answer).await {
            Ok(()) => (ExchangeState::Completed, None),
            Err(Stop::Cancelled) => (ExchangeState::Cancelled, None),
            Err(Stop::Failed(err)) => (ExchangeState::Failed, Some(err)),
        };

        self.state.send_replace(state);
        match &error {
            None if state == ExchangeState::Completed => self.callbacks.on_completed(),
            None => {}
            Some(err) => self.callbacks.on_failed(&err.to_string()),
        }

        info!(
            id = self.id,
            %state,
            answer_chars = answer.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            error = ?error,
            "exchange finished"
        );

        ExchangeOutcome {
            id: self.id,
            state,
            answer,
            error,
        }
    }

    fn timeout(&self, kind: TimeoutKind) -> Stop {
        let after = match kind {
            TimeoutKind::Exchange => self.settings.timeout(),
            TimeoutKind::Stalled => self.settings.stall_timeout(),
        };
        warn!(id = self.id, %kind, after_secs = after.as_secs(), "exchange timed out");
        Stop::Failed(ExchangeError::Timeout { kind, after })
    }

    fn heartbeat(&self, started: Instant, phase: &'static str) {
        let elapsed = started.elapsed();
        debug!(id = self.id, elapsed_secs = elapsed.as_secs(), "{phase}");
        self.callbacks.on_heartbeat(elapsed);
    }

    async fn exchange(&self, started: Instant, answer: &mut String) -> Result<(), Stop> {
        let expiry = tokio::time::sleep_until(started + self.settings.timeout());
        tokio::pin!(expiry);

        let plan = self
            .planner
            .plan(&self.document, &self.history, &self.question);
        self.callbacks.on_report(&plan.report);
        if self.cancel.is_cancelled() {
            return Err(Stop::Cancelled);
        }
        let request = ChatRequest::new(
            plan.report.model.clone(),
            plan.messages(&self.history, &self.question),
        );

        self.state.send_replace(ExchangeState::Streaming);
        debug!(
            id = self.id,
            provider = self.provider.name(),
            messages = request.messages.len(),
            "sending request"
        );

        let period = self.settings.heartbeat();
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Slow providers may hold the response headers for a long time.
        let connect = self.provider.chat_stream(&request);
        tokio::pin!(connect);
        let mut rx = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Stop::Cancelled),
                _ = &mut expiry => return Err(self.timeout(TimeoutKind::Exchange)),
                result = &mut connect => {
                    break result.map_err(|e| Stop::Failed(e.into()))?;
                }
                _ = heartbeat.tick() => self.heartbeat(started, "waiting for provider response"),
            }
        };

        let stall_after = self.settings.stall_timeout();
        let stall = tokio::time::sleep(stall_after);
        tokio::pin!(stall);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Stop::Cancelled),
                _ = &mut expiry => return Err(self.timeout(TimeoutKind::Exchange)),
                _ = &mut stall => return Err(self.timeout(TimeoutKind::Stalled)),
                _ = heartbeat.tick() => self.heartbeat(started, "exchange still streaming"),
                item = rx.recv() => match item {
                    Some(Ok(StreamChunk::Text(text))) => {
                        stall.as_mut().reset(Instant::now() + stall_after);
                        if self.cancel.is_cancelled() {
                            return Err(Stop::Cancelled);
                        }
                        answer.push_str(&text);
                        self.callbacks.on_chunk(&text);
                    }
                    Some(Ok(StreamChunk::Done)) | None => {
                        return if answer.is_empty() {
                            Err(Stop::Failed(ExchangeError::EmptyStream))
                        } else {
                            Ok(())
                        };
                    }
                    Some(Err(err)) => return Err(Stop::Failed(err.into())),
                },
            }
        }
    }
}
