//! Event dispatcher
//!
//! Subscribers are kept in registration order. Each one owns a bounded queue,
//! so a slow or dropped subscriber never holds up the others: when a queue is
//! full the event is dropped for that subscriber alone and counted in
//! [`EventStream::missed`].

use crate::events::DispatchEvent;
use futures::Stream;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Events queued per subscriber before new ones are dropped
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 4096;

struct Subscriber {
    /// Event names to deliver; `None` delivers everything
    filter: Option<HashSet<String>>,
    sender: mpsc::Sender<DispatchEvent>,
    missed: Arc<AtomicU64>,
}

impl Subscriber {
    fn wants(&self, event: &DispatchEvent) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |names| names.contains(&event.name))
    }
}

/// Delivers dispatch events to every subscriber, in arrival order
pub struct EventDispatcher {
    subscribers: Mutex<Vec<Subscriber>>,
    buffer: usize,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// Dispatcher whose subscribers queue at most `buffer` events each
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            buffer: buffer.max(1),
        }
    }

    /// Receive every dispatch event
    pub fn subscribe(&self) -> EventStream {
        self.register(None)
    }

    /// Receive only events with one of the given names
    pub fn subscribe_to<I, S>(&self, names: I) -> EventStream
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(Some(names.into_iter().map(Into::into).collect()))
    }

    fn register(&self, filter: Option<HashSet<String>>) -> EventStream {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let missed = Arc::new(AtomicU64::new(0));
        let mut subscribers = self.subscribers.lock();
        subscribers.push(Subscriber {
            filter,
            sender,
            missed: Arc::clone(&missed),
        });

        tracing::debug!(subscribers = subscribers.len(), "Event subscriber registered");

        EventStream { receiver, missed }
    }

    /// Hand an event to every interested subscriber
    ///
    /// Subscribers whose stream was dropped are removed. Returns the number of
    /// subscribers the event was delivered to.
    pub fn dispatch(&self, event: &DispatchEvent) -> usize {
        let mut delivered = 0;
        let mut subscribers = self.subscribers.lock();

        subscribers.retain(|subscriber| {
            if !subscriber.wants(event) {
                return !subscriber.sender.is_closed();
            }
            match subscriber.sender.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    let missed = subscriber.missed.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(
                        event = %event.name,
                        seq = ?event.sequence,
                        missed,
                        "Subscriber queue full, dropping event"
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });

        tracing::trace!(event = %event.name, seq = ?event.sequence, delivered, "Event dispatched");

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| !subscriber.sender.is_closed());
        subscribers.len()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.subscribers.lock().len())
            .field("buffer", &self.buffer)
            .finish()
    }
}

/// Ordered stream of dispatch events for one subscriber
///
/// Ends when the gateway client is dropped.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::Receiver<DispatchEvent>,
    missed: Arc<AtomicU64>,
}

impl EventStream {
    pub async fn recv(&mut self) -> Option<DispatchEvent> {
        self.receiver.recv().await
    }

    /// Next event if one is already queued
    pub fn try_recv(&mut self) -> Option<DispatchEvent> {
        self.receiver.try_recv().ok()
    }

    /// Events dropped because this stream's queue was full
    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }
}

impl Stream for EventStream {
    type Item = DispatchEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
