//! Best-effort progress reporting.
//!
//! Producers never wait on a consumer: events go through a bounded channel
//! with `try_send`, and anything that does not fit is dropped. Progress is
//! advisory, so nothing downstream may depend on receiving every event.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Default channel buffer size for progress updates.
pub const PROGRESS_CHANNEL_SIZE: usize = 100;

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Scanning,
    Reading,
    Complete,
}

/// A single progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Stage that produced the event.
    pub phase: Phase,
    /// Items handled so far.
    pub current: u64,
    /// Items expected in total, when countable.
    pub total: Option<u64>,
    /// The item being handled (a relative path).
    pub item: Option<String>,
    /// Free-form stage label.
    pub label: Option<String>,
}

impl ProgressEvent {
    /// An event for an uncountable stage.
    pub fn stage(phase: Phase, current: u64, item: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total: None,
            item: Some(item.into()),
            label: None,
        }
    }

    /// An event with known progress `current / total`.
    pub fn counted(phase: Phase, current: u64, total: u64, item: Option<String>) -> Self {
        Self {
            phase,
            current,
            total: Some(total),
            item,
            label: None,
        }
    }

    /// Attach a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Progress as a percentage (0.0 to 100.0) when the total is known.
    pub fn percentage(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some(self.current as f64 / total as f64 * 100.0),
            None => None,
        }
    }
}

/// Sending half of a best-effort progress channel.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressSender {
    /// Create a bounded progress channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit an event without blocking. Returns whether it was delivered.
    pub fn emit(&self, event: ProgressEvent) -> bool {
        match &self.tx {
            Some(tx) => tx.try_send(event).is_ok(),
            None => false,
        }
    }

    /// Whether a receiver may be listening.
    pub fn is_enabled(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let event = ProgressEvent::counted(Phase::Reading, 1, 4, None);
        assert_eq!(event.percentage(), Some(25.0));
        let event = ProgressEvent::stage(Phase::Scanning, 3, "src");
        assert_eq!(event.percentage(), None);
        assert_eq!(Phase::Complete.to_string(), "complete");
    }

    #[test]
    fn test_emit_drops_when_full() {
        let (sender, mut rx) = ProgressSender::channel(2);
        for i in 0..10 {
            sender.emit(ProgressEvent::stage(Phase::Scanning, i, "x"));
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 2);
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (sender, rx) = ProgressSender::channel(4);
        drop(rx);
        assert!(!sender.emit(ProgressEvent::stage(Phase::Scanning, 0, "x")));
        assert!(!sender.is_enabled());
        assert!(!ProgressSender::disabled().emit(ProgressEvent::stage(Phase::Complete, 0, "x")));
    }
}
