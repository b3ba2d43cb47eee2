//! One question, one streamed answer.
//!
//! An exchange moves through
//! `Idle → Building → Streaming → {Completed | Failed | Cancelled}`:
//! the context is planned, the request is sent, and answer text is forwarded
//! to the caller as it arrives. A [`ChatOrchestrator`] runs at most one
//! exchange at a time.

mod callbacks;
mod cancel;
mod orchestrator;

use std::fmt;
use std::time::Duration;

use crate::llm::LlmError;

pub use callbacks::{ExchangeCallbacks, ExchangeEvent};
pub use cancel::CancelToken;
pub use orchestrator::{ChatOrchestrator, ExchangeOutcome};

/// Lifecycle of the current exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeState {
    #[default]
    Idle,
    Building,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl ExchangeState {
    /// Whether the exchange has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Which limit an exchange ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// Wall-clock ceiling for the whole exchange.
    Exchange,
    /// No data from the provider for too long.
    Stalled,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exchange => f.write_str("no complete answer"),
            Self::Stalled => f.write_str("no data from the provider"),
        }
    }
}

/// Why an exchange failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    #[error("QA engine is not configured or disabled")]
    Disabled,

    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("timed out: {kind} within {}s", after.as_secs())]
    Timeout { kind: TimeoutKind, after: Duration },

    #[error("the provider finished without sending an answer")]
    EmptyStream,
}
