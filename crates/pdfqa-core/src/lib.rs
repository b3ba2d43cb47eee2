#![deny(unsafe_code)]

//! pdfqa core engine.
//!
//! Decides which parts of an extracted PDF fit into a model's context window
//! and drives one streaming question-answering exchange at a time:
//!
//! ```text
//! document text ──▶ pages::filter ──▶ context::budget ──▶ context::relevance
//!                                                              │
//!                        provider ◀── exchange::ChatOrchestrator ◀┘
//! ```

use std::future::Future;
use std::pin::Pin;

/// Boxed `Send` future returned by trait methods that are called through
/// `dyn` (see [`llm::ChatProvider`]).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Token estimation, budget arithmetic, relevance truncation and planning.
pub mod context;
/// Cancellable streaming exchanges with a chat provider.
pub mod exchange;
/// Per-session conversation history.
pub mod history;
/// Streaming chat providers (OpenAI-compatible and Ollama-style).
pub mod llm;
/// In-memory log collector for a chat session.
pub mod logging;
/// Page-range parsing and page-marker filtering.
pub mod pages;

pub use context::{ContextPlan, ContextPlanner, ContextReport, RelevanceTruncator, TokenEstimator};
pub use exchange::{
    ChatOrchestrator, ExchangeCallbacks, ExchangeError, ExchangeEvent, ExchangeOutcome, ExchangeState,
};
pub use history::{ConversationHistory, ConversationTurn};
pub use logging::{LogCollector, LogReader};
pub use pages::{PageFilter, PageIndexSet, PageRangeError};
