use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use super::events::{EventKind, ProgressEvent};

/// Creates a bounded event channel.
///
/// Producers never wait: when the buffer is full the event is dropped and
/// counted, when the reader is gone the event is discarded silently.
pub fn progress_channel(capacity: usize) -> (ProgressSender, ProgressStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        ProgressSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        ProgressStream { rx, dropped },
    )
}

/// Producer half, cloned into every worker.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
    dropped: Arc<AtomicU64>,
}

impl ProgressSender {
    /// Sends without waiting. Returns whether the event was queued.
    pub fn emit(&self, kind: EventKind) -> bool {
        match self.tx.try_send(ProgressEvent::now(kind)) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(event = ?event.kind, dropped = total, "Progress buffer full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Waits for buffer space instead of dropping. Used for the terminal
    /// event of a run.
    pub async fn deliver(&self, kind: EventKind) -> bool {
        self.tx.send(ProgressEvent::now(kind)).await.is_ok()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Whether the reader has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Single-reader half.
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::Receiver<ProgressEvent>,
    dropped: Arc<AtomicU64>,
}

impl ProgressStream {
    /// Next event, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Events lost to a full buffer so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drains every remaining event until the producers finish.
    pub async fn collect_all(mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }

    /// Adapts the receiver into a stream.
    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            stream.recv().await.map(|event| (event, stream))
        })
    }

    /// Like [`into_stream`](Self::into_stream), but yields a heartbeat
    /// whenever no event arrives within `interval`.
    pub fn with_heartbeat(self, interval: Duration) -> impl Stream<Item = ProgressEvent> + Send {
        futures::stream::unfold(self, move |mut stream| async move {
            match tokio::time::timeout(interval, stream.recv()).await {
                Ok(Some(event)) => Some((event, stream)),
                Ok(None) => None,
                Err(_) => Some((ProgressEvent::now(EventKind::Heartbeat), stream)),
            }
        })
    }
}
