//! Channel plumbing between the multiplexer task and its consumer.

use tokio::sync::mpsc;
use tracing::debug;

use super::StreamEvent;

/// Create a bounded event channel for one generation.
pub fn event_channel(capacity: usize) -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, EventStream { rx })
}

/// Sender half, held by the generation task.
///
/// Sends are best-effort: the consumer may abandon an in-flight generation
/// at any time (navigation away), in which case events are simply dropped.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSender {
    /// Send an event, ignoring a departed consumer.
    pub async fn send(&self, event: StreamEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("event receiver dropped, discarding event");
        }
    }

    /// Whether the consumer is still listening.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Receiver half, consumed by the reconciler.
pub struct EventStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl EventStream {
    /// Receive the next event. Returns `None` once the stream is complete
    /// and the sender has gone away.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drain every remaining event. Test and batch-consumer convenience.
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }
}
