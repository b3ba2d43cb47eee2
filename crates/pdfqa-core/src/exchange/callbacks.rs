//! Notifications from a running exchange to its caller.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::context::ContextReport;

/// Fire-and-forget notifications from an exchange.
///
/// Called from the exchange's worker task, so implementations must be cheap
/// and must not block. Exactly one of `on_completed` / `on_failed` is called
/// per exchange, unless the exchange is cancelled, in which case neither is.
pub trait ExchangeCallbacks: Send + Sync {
    /// A piece of the answer, in provider order.
    fn on_chunk(&self, text: &str);

    fn on_completed(&self);

    fn on_failed(&self, message: &str);

    /// Liveness pulse while the answer is streaming.
    fn on_heartbeat(&self, _elapsed: Duration) {}

    /// What went into the request, before it is sent.
    fn on_report(&self, _report: &ContextReport) {}
}

/// Callback invocations as values, for channel-based consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent {
    Report(ContextReport),
    Chunk(String),
    Heartbeat(Duration),
    Completed,
    Failed(String),
}

impl ExchangeCallbacks for mpsc::UnboundedSender<ExchangeEvent> {
    fn on_chunk(&self, text: &str) {
        let _ = self.send(ExchangeEvent::Chunk(text.to_string()));
    }

    fn on_completed(&self) {
        let _ = self.send(ExchangeEvent::Completed);
    }

    fn on_failed(&self, message: &str) {
        let _ = self.send(ExchangeEvent::Failed(message.to_string()));
    }

    fn on_heartbeat(&self, elapsed: Duration) {
        let _ = self.send(ExchangeEvent::Heartbeat(elapsed));
    }

    fn on_report(&self, report: &ContextReport) {
        let _ = self.send(ExchangeEvent::Report(report.clone()));
    }
}
