//! Progress subscription port
//!
//! Subscribers receive every [`ProgressSnapshot`] published by the
//! [`ProgressMonitor`](crate::progress::ProgressMonitor).

use medreason_domain::ProgressSnapshot;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Progress subscriber failed: {0}")]
pub struct SubscriberError(pub String);

/// Receives model loading progress.
///
/// Called synchronously while the monitor delivers a snapshot; keep it short.
pub trait ProgressSubscriber: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> Result<(), SubscriberError>;
}

/// Forwards snapshots into a channel for async consumers.
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<ProgressSnapshot>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSubscriber for ChannelSubscriber {
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> Result<(), SubscriberError> {
        self.tx
            .send(snapshot.clone())
            .map_err(|_| SubscriberError("receiver dropped".to_string()))
    }
}
