use crate::config::OverflowPolicy;
use crate::error::ErrorKind;
use crate::message::Frame;
use events::Envelope;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Unique identifier for a subscriber (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a subscriber.
///
/// `Connecting` → `Active` once the history snapshot is queued, `Active` → `Draining`
/// on unsubscribe while frames are still pending, and `Closed` once drained, on a
/// transport failure, or on overflow under [`OverflowPolicy::DisconnectSlowConsumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Connecting,
    Active,
    Draining,
    Closed,
}

/// Result of offering an envelope to a subscriber's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// Queued after evicting the oldest pending envelope.
    DroppedOldest,
    /// The queue was full and the subscriber is now closed.
    Overflowed,
    /// The subscriber no longer accepts envelopes (draining or closed).
    Rejected,
}

/// What the delivery worker should do next.
#[derive(Debug)]
pub(crate) enum Next {
    Frame(Frame),
    Wait,
    Finished,
}

#[derive(Debug)]
struct Outbound {
    state: SubscriberState,
    // Held apart from `events` so it never counts against capacity and is never evicted.
    snapshot: Option<Vec<Arc<Envelope>>>,
    events: VecDeque<Arc<Envelope>>,
    last_error: Option<ErrorKind>,
    dropped: u64,
}

/// One connected client: a bounded outbound queue plus its lifecycle state.
///
/// The hub offers envelopes with [`Subscriber::enqueue`], which never blocks; the
/// subscriber's single delivery worker consumes them with [`Subscriber::recv`].
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    capacity: usize,
    outbound: Mutex<Outbound>,
    notify: Notify,
    // Fired whenever the subscriber leaves `Active`
    stopped: Notify,
}

impl Subscriber {
    pub fn new(id: SubscriberId, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            id,
            capacity,
            outbound: Mutex::new(Outbound {
                state: SubscriberState::Connecting,
                snapshot: None,
                events: VecDeque::with_capacity(capacity),
                last_error: None,
                dropped: 0,
            }),
            notify: Notify::new(),
            stopped: Notify::new(),
        }
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    pub fn state(&self) -> SubscriberState {
        self.lock().state
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.lock().last_error.clone()
    }

    /// Number of envelopes evicted under the drop-oldest policy.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Number of live envelopes waiting for delivery (the snapshot is not counted).
    pub fn pending(&self) -> usize {
        self.lock().events.len()
    }

    /// Queue the history snapshot as the first frame and become `Active`.
    pub(crate) fn activate(&self, snapshot: Vec<Arc<Envelope>>) {
        let mut outbound = self.lock();
        if outbound.state == SubscriberState::Connecting {
            outbound.snapshot = Some(snapshot);
            outbound.state = SubscriberState::Active;
        }
        drop(outbound);
        self.notify.notify_one();
    }

    /// Offer an envelope without blocking, applying `policy` when the queue is full.
    pub fn enqueue(&self, envelope: Arc<Envelope>, policy: OverflowPolicy) -> Enqueued {
        let mut outbound = self.lock();
        if outbound.state != SubscriberState::Active {
            return Enqueued::Rejected;
        }

        let outcome = if outbound.events.len() < self.capacity {
            outbound.events.push_back(envelope);
            Enqueued::Queued
        } else {
            match policy {
                OverflowPolicy::DropOldest => {
                    outbound.events.pop_front();
                    outbound.events.push_back(envelope);
                    outbound.dropped += 1;
                    Enqueued::DroppedOldest
                }
                OverflowPolicy::DisconnectSlowConsumer => {
                    Self::release(&mut outbound, Some(ErrorKind::QueueOverflow));
                    Enqueued::Overflowed
                }
            }
        };
        drop(outbound);

        if outcome == Enqueued::Overflowed {
            self.stopped.notify_waiters();
        }
        self.notify.notify_one();
        outcome
    }

    /// Stop accepting envelopes; pending frames are still delivered.
    ///
    /// Returns `false` when the subscriber was already draining or closed.
    pub(crate) fn begin_drain(&self) -> bool {
        let mut outbound = self.lock();
        let transitioned = match outbound.state {
            SubscriberState::Connecting | SubscriberState::Active => {
                outbound.state = if outbound.snapshot.is_none() && outbound.events.is_empty() {
                    SubscriberState::Closed
                } else {
                    SubscriberState::Draining
                };
                true
            }
            SubscriberState::Draining | SubscriberState::Closed => false,
        };
        drop(outbound);

        if transitioned {
            self.stopped.notify_waiters();
        }
        self.notify.notify_one();
        transitioned
    }

    /// Close immediately, discarding anything still queued.
    pub(crate) fn close(&self, error: Option<ErrorKind>) {
        let mut outbound = self.lock();
        Self::release(&mut outbound, error);
        drop(outbound);

        self.stopped.notify_waiters();
        self.notify.notify_one();
    }

    /// Resolves with the new state once the subscriber is `Draining` or `Closed`.
    ///
    /// Lets a worker blocked in a transport write notice that it was told to stop.
    pub(crate) async fn deactivated(&self) -> SubscriberState {
        loop {
            let notified = self.stopped.notified();
            tokio::pin!(notified);
            // Registered before the state check so a concurrent notify_waiters is not missed
            notified.as_mut().enable();

            match self.state() {
                state @ (SubscriberState::Draining | SubscriberState::Closed) => return state,
                SubscriberState::Connecting | SubscriberState::Active => notified.await,
            }
        }
    }

    /// Wait for the next frame. Returns `None` once the subscriber is closed.
    pub(crate) async fn recv(&self) -> Option<Frame> {
        loop {
            match self.next() {
                Next::Frame(frame) => return Some(frame),
                Next::Finished => return None,
                // notify_one stores a permit, so a wake between `next` and here is not lost
                Next::Wait => self.notify.notified().await,
            }
        }
    }

    pub(crate) fn next(&self) -> Next {
        let mut outbound = self.lock();
        if outbound.state == SubscriberState::Closed {
            return Next::Finished;
        }
        if let Some(snapshot) = outbound.snapshot.take() {
            return Next::Frame(Frame::Snapshot(snapshot));
        }
        if let Some(envelope) = outbound.events.pop_front() {
            return Next::Frame(Frame::Event(envelope));
        }
        if outbound.state == SubscriberState::Draining {
            outbound.state = SubscriberState::Closed;
            return Next::Finished;
        }
        Next::Wait
    }

    fn release(outbound: &mut Outbound, error: Option<ErrorKind>) {
        outbound.state = SubscriberState::Closed;
        outbound.snapshot = None;
        outbound.events = VecDeque::new();
        if error.is_some() {
            outbound.last_error = error;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Outbound> {
        // The guarded data is plain queue state; a panic elsewhere cannot leave it torn.
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared reference to a registered subscriber, handed to the connection that
/// created it and to its delivery worker.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    subscriber: Arc<Subscriber>,
}

impl SubscriberHandle {
    pub(crate) fn new(subscriber: Arc<Subscriber>) -> Self {
        Self { subscriber }
    }

    pub fn id(&self) -> &SubscriberId {
        self.subscriber.id()
    }

    pub fn state(&self) -> SubscriberState {
        self.subscriber.state()
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.subscriber.last_error()
    }

    pub fn dropped(&self) -> u64 {
        self.subscriber.dropped()
    }

    pub fn pending(&self) -> usize {
        self.subscriber.pending()
    }

    /// Wait for the next frame. Returns `None` once the subscriber is closed.
    pub async fn recv(&self) -> Option<Frame> {
        self.subscriber.recv().await
    }

    pub(crate) fn subscriber(&self) -> &Arc<Subscriber> {
        &self.subscriber
    }
}
