use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OutboxClosed {
    #[error("outbound queue closed")]
    Closed,
    #[error("outbound queue full")]
    Full,
}

/// Sending half of a session's outbound message queue.
///
/// Cloning shares the queue. `close` is visible to every clone and to the
/// receiver, which drains what was queued before the close and then ends.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<String>,
    closed: Arc<watch::Sender<bool>>,
}

/// Receiving half, owned by the session's writer task.
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: mpsc::Receiver<String>,
    closed: watch::Receiver<bool>,
}

/// Create a bounded outbound queue.
pub fn outbox(capacity: usize) -> (Outbox, OutboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (closed_tx, closed_rx) = watch::channel(false);
    (
        Outbox {
            tx,
            closed: Arc::new(closed_tx),
        },
        OutboxReceiver {
            rx,
            closed: closed_rx,
        },
    )
}

impl Outbox {
    /// Queue a message, waiting for capacity if the queue is full.
    pub async fn push(&self, msg: impl Into<String>) -> Result<(), OutboxClosed> {
        let mut closed = self.closed.subscribe();
        tokio::select! {
            biased;
            _ = closed.wait_for(|c| *c) => Err(OutboxClosed::Closed),
            res = self.tx.send(msg.into()) => res.map_err(|_| OutboxClosed::Closed),
        }
    }

    /// Queue a message without waiting. Used when one session notifies another,
    /// so a slow peer never stalls the sender.
    pub fn try_push(&self, msg: impl Into<String>) -> Result<(), OutboxClosed> {
        if self.is_closed() {
            return Err(OutboxClosed::Closed);
        }
        match self.tx.try_send(msg.into()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(OutboxClosed::Full),
            Err(TrySendError::Closed(_)) => Err(OutboxClosed::Closed),
        }
    }

    /// Close the queue. Idempotent.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.tx.is_closed()
    }

    /// Resolves once the queue is closed or the receiver is gone.
    pub async fn closed(&self) {
        let mut closed = self.closed.subscribe();
        tokio::select! {
            _ = closed.wait_for(|c| *c) => {}
            _ = self.tx.closed() => {}
        }
    }
}

impl OutboxReceiver {
    /// Next queued message. After a close, returns what is still buffered
    /// and then `None`.
    pub async fn recv(&mut self) -> Option<String> {
        if *self.closed.borrow() {
            return self.rx.try_recv().ok();
        }
        tokio::select! {
            biased;
            msg = self.rx.recv() => msg,
            _ = self.closed.wait_for(|c| *c) => self.rx.try_recv().ok(),
        }
    }
}
