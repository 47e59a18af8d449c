//! `EventStream`: a bounded, closable delivery queue owned by one subscriber.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use ledgerstream_core::event::TransactionEvent;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("cannot notify closed stream")]
    Closed,

    #[error("account event stream channel full")]
    Full,
}

struct StreamState {
    closed: bool,
    sender: Option<mpsc::Sender<Arc<TransactionEvent>>>,
}

/// Producer side of a subscriber's event queue.
///
/// `notify` never waits: the event is either queued immediately or the
/// stream is closed. The closed check and the enqueue happen under one lock
/// so a concurrent `close` cannot slip between them.
pub struct EventStream {
    id: u64,
    capacity: usize,
    state: Mutex<StreamState>,
}

impl EventStream {
    /// Create a stream holding at most `capacity` undelivered events.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> (Arc<Self>, EventSubscription) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let stream = Arc::new(Self {
            id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            state: Mutex::new(StreamState {
                closed: false,
                sender: Some(tx),
            }),
        });
        (stream, EventSubscription { rx })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Queue an event for the subscriber.
    ///
    /// Fails with `Closed` if the stream was already closed (or the
    /// subscriber went away). Fails with `Full` if the queue has no room, in
    /// which case the stream is closed as well.
    pub fn notify(&self, event: Arc<TransactionEvent>) -> Result<(), StreamError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(StreamError::Closed);
        }

        let outcome = match state.sender.as_ref() {
            Some(sender) => sender.try_send(event),
            None => return Err(StreamError::Closed),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                Self::close_locked(&mut state);
                tracing::warn!(stream = self.id, capacity = self.capacity, "closing full account stream");
                Err(StreamError::Full)
            }
            Err(TrySendError::Closed(_)) => {
                Self::close_locked(&mut state);
                Err(StreamError::Closed)
            }
        }
    }

    /// Close the stream. Idempotent.
    ///
    /// Events already queued can still be drained by the subscriber, after
    /// which it observes end of stream.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if Self::close_locked(&mut state) {
            tracing::debug!(stream = self.id, "account stream closed");
        }
    }

    fn close_locked(state: &mut StreamState) -> bool {
        if state.closed {
            return false;
        }
        state.closed = true;
        state.sender = None;
        true
    }
}

/// Consumer side of an `EventStream`.
pub struct EventSubscription {
    rx: mpsc::Receiver<Arc<TransactionEvent>>,
}

impl EventSubscription {
    /// Wait for the next event; `None` once the stream is closed and drained.
    pub async fn recv(&mut self) -> Option<Arc<TransactionEvent>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Arc<TransactionEvent>, TryRecvError> {
        self.rx.try_recv()
    }
}

impl Stream for EventSubscription {
    type Item = Arc<TransactionEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
