//! One-way progress reporting.
//!
//! The engine offers [`SyncProgress`] messages to a bounded channel with
//! `try_send`; a slow, full or dropped receiver never holds up a run.

use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

/// Default channel capacity used by [`SyncRunner::spawn`](crate::SyncRunner::spawn).
pub const DEFAULT_PROGRESS_CAPACITY: usize = 64;

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncProgress {
    pub message: String,
    pub current: usize,
    pub total: usize,
}

impl fmt::Display for SyncProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.message, self.current, self.total)
    }
}

/// Sending side of the progress channel.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::Sender<SyncProgress>>,
}

impl ProgressReporter {
    /// Creates a reporter writing to `tx`.
    pub fn new(tx: mpsc::Sender<SyncProgress>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Creates a reporter that drops every message.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Creates a reporter together with its receiver.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncProgress>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Offers a message without waiting.
    pub fn report(&self, message: impl Into<String>, current: usize, total: usize) {
        let Some(ref tx) = self.tx else {
            return;
        };
        let progress = SyncProgress {
            message: message.into(),
            current,
            total,
        };
        match tx.try_send(progress) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => trace!(progress = %dropped, "Progress channel full"),
            Err(TrySendError::Closed(_)) => trace!("Progress receiver gone"),
        }
    }
}
