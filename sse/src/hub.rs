use crate::config::HubConfig;
use crate::connection::{Enqueued, Subscriber, SubscriberHandle, SubscriberId};
use crate::error::{Error, ErrorKind};
use crate::history::History;
use dashmap::DashMap;
use events::{Envelope, Payload, Sequence};
use log::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result of a successful `subscribe`: the handle used to receive and to later
/// unsubscribe, plus the history replayed to this subscriber (oldest first).
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriberHandle,
    pub snapshot: Vec<Arc<Envelope>>,
}

/// State that must change atomically with respect to subscriber registration.
#[derive(Debug)]
struct Core {
    history: History,
    next_sequence: Sequence,
}

/// Broadcast hub fanning published envelopes out to every registered subscriber.
///
/// # Locking
///
/// `core` is the hub's single critical section. `publish` holds it while assigning
/// the sequence, appending to history and offering the envelope to every subscriber;
/// `subscribe` holds it while capturing the snapshot and registering. A new
/// subscriber therefore sees each envelope exactly once, either in its snapshot or
/// in its queue. Offering never blocks and nothing awaits under the lock; transport
/// writes happen only in delivery workers.
///
/// `subscribers` is a `DashMap` so `unsubscribe` and `snapshot` do not contend on
/// `core`. Removal takes the shard write lock, so once `unsubscribe` returns no later
/// `publish` can reach the removed subscriber.
pub struct Hub {
    config: HubConfig,
    subscribers: DashMap<SubscriberId, Arc<Subscriber>>,
    core: Mutex<Core>,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        info!(
            "Broadcast hub config: max_subscribers={}, queue_capacity={}, \
             history_capacity={}, overflow_policy={}, drain_timeout={:?}",
            config.max_subscribers,
            config.queue_capacity,
            config.history_capacity,
            config.overflow_policy,
            config.drain_timeout,
        );

        Self {
            core: Mutex::new(Core {
                history: History::new(config.history_capacity),
                next_sequence: 1,
            }),
            subscribers: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new subscriber and return it with the current history snapshot.
    ///
    /// Fails with `ResourceExhausted` when `max_subscribers` are already registered.
    pub fn subscribe(&self) -> Result<Subscription, Error> {
        let core = self.lock_core();

        if self.subscribers.len() >= self.config.max_subscribers {
            warn!(
                "Rejecting subscriber: limit of {} reached",
                self.config.max_subscribers
            );
            return Err(Error::new(ErrorKind::ResourceExhausted));
        }

        let subscriber = Arc::new(Subscriber::new(
            SubscriberId::new(),
            self.config.queue_capacity,
        ));
        let snapshot = core.history.snapshot();
        subscriber.activate(snapshot.clone());
        self.subscribers
            .insert(subscriber.id().clone(), Arc::clone(&subscriber));
        drop(core);

        info!(
            "Registered subscriber {} (replaying {} envelopes)",
            subscriber.id(),
            snapshot.len()
        );

        Ok(Subscription {
            handle: SubscriberHandle::new(subscriber),
            snapshot,
        })
    }

    /// Remove a subscriber from the live set and let its worker drain and exit.
    ///
    /// Idempotent: repeated calls, or calls after the hub already removed the
    /// subscriber, do nothing.
    pub fn unsubscribe(&self, handle: &SubscriberHandle) {
        if self.subscribers.remove(handle.id()).is_some() {
            info!("Unregistering subscriber {}", handle.id());
        } else {
            debug!("Subscriber {} already unregistered", handle.id());
        }

        handle.subscriber().begin_drain();
    }

    /// Publish a payload to every registered subscriber and return its sequence.
    ///
    /// Never blocks on a subscriber: full queues are resolved by the configured
    /// overflow policy, and subscribers closed by it are removed before returning.
    pub fn publish(&self, payload: Payload) -> Sequence {
        let mut core = self.lock_core();

        let sequence = core.next_sequence;
        core.next_sequence += 1;

        let envelope = Arc::new(Envelope::new(sequence, payload));
        core.history.push(Arc::clone(&envelope));

        let mut overflowed = Vec::new();
        let mut delivered = 0usize;
        for entry in self.subscribers.iter() {
            match entry
                .value()
                .enqueue(Arc::clone(&envelope), self.config.overflow_policy)
            {
                Enqueued::Queued => delivered += 1,
                Enqueued::DroppedOldest => {
                    delivered += 1;
                    debug!(
                        "Subscriber {} is lagging, dropped its oldest pending envelope",
                        entry.key()
                    );
                }
                Enqueued::Overflowed => overflowed.push(entry.key().clone()),
                Enqueued::Rejected => {}
            }
        }

        for id in overflowed {
            warn!("Disconnecting slow subscriber {id}: outbound queue overflowed");
            self.subscribers.remove(&id);
        }
        drop(core);

        debug!("Published envelope {sequence} to {delivered} subscriber(s)");

        sequence
    }

    /// Number of registered subscribers.
    pub fn snapshot(&self) -> usize {
        self.subscribers.len()
    }

    /// Copy of the history buffer, oldest first.
    pub fn history(&self) -> Vec<Arc<Envelope>> {
        self.lock_core().history.snapshot()
    }

    /// Sequence of the most recent publish, if any.
    pub fn last_sequence(&self) -> Option<Sequence> {
        let next_sequence = self.lock_core().next_sequence;
        next_sequence.checked_sub(1).filter(|sequence| *sequence > 0)
    }

    /// Unsubscribe everyone so every delivery worker drains and exits.
    pub fn shutdown(&self) {
        let ids: Vec<SubscriberId> = self
            .subscribers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        info!("Shutting down broadcast hub, draining {} subscriber(s)", ids.len());

        for id in ids {
            if let Some((_, subscriber)) = self.subscribers.remove(&id) {
                subscriber.begin_drain();
            }
        }
    }

    fn lock_core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use crate::connection::SubscriberState;
    use crate::message::Frame;
    use std::thread;

    fn text(text: &str) -> Payload {
        Payload::text(text, 1024).unwrap()
    }

    fn hub(history_capacity: usize, queue_capacity: usize, policy: OverflowPolicy) -> Hub {
        Hub::new(HubConfig {
            max_subscribers: 128,
            queue_capacity,
            history_capacity,
            overflow_policy: policy,
            ..HubConfig::default()
        })
    }

    fn payloads(envelopes: &[Arc<Envelope>]) -> Vec<String> {
        envelopes
            .iter()
            .map(|e| e.payload().as_value().as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_publish_assigns_consecutive_sequences() {
        let hub = Hub::default();

        let sequences: Vec<Sequence> = (0..5).map(|i| hub.publish(text(&i.to_string()))).collect();

        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        assert_eq!(hub.last_sequence(), Some(5));
    }

    #[test]
    fn test_last_sequence_is_none_before_first_publish() {
        assert_eq!(Hub::default().last_sequence(), None);
    }

    #[test]
    fn test_concurrent_publishers_get_unique_sequences() {
        let hub = Arc::new(Hub::default());

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let hub = Arc::clone(&hub);
                thread::spawn(move || (0..250).map(|_| hub.publish(text("x"))).collect::<Vec<_>>())
            })
            .collect();

        let mut sequences: Vec<Sequence> = workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect();
        sequences.sort_unstable();

        assert_eq!(sequences, (1..=2000).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrent_subscribers_see_every_event_exactly_once() {
        const PUBLISHERS: u64 = 4;
        const PER_PUBLISHER: u64 = 500;
        const TOTAL: u64 = PUBLISHERS * PER_PUBLISHER;

        let hub = Arc::new(Hub::new(HubConfig {
            max_subscribers: 128,
            queue_capacity: TOTAL as usize,
            history_capacity: 64,
            overflow_policy: OverflowPolicy::DisconnectSlowConsumer,
            ..HubConfig::default()
        }));

        let publishers: Vec<_> = (0..PUBLISHERS)
            .map(|_| {
                let hub = Arc::clone(&hub);
                thread::spawn(move || {
                    for _ in 0..PER_PUBLISHER {
                        hub.publish(text("x"));
                    }
                })
            })
            .collect();
        let subscribers: Vec<_> = (0..4)
            .map(|_| {
                let hub = Arc::clone(&hub);
                thread::spawn(move || {
                    (0..20)
                        .map(|_| {
                            thread::yield_now();
                            hub.subscribe().unwrap().handle
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for publisher in publishers {
            publisher.join().unwrap();
        }
        let handles: Vec<SubscriberHandle> = subscribers
            .into_iter()
            .flat_map(|subscriber| subscriber.join().unwrap())
            .collect();
        assert_eq!(handles.len(), 80);

        for handle in handles {
            let mut seen = Vec::new();
            while let crate::connection::Next::Frame(frame) = handle.subscriber().next() {
                match frame {
                    Frame::Snapshot(envelopes) => {
                        seen.extend(envelopes.iter().map(|e| e.sequence()))
                    }
                    Frame::Event(envelope) => seen.push(envelope.sequence()),
                }
            }

            assert_eq!(handle.last_error(), None);
            let first = *seen.first().expect("subscriber saw nothing");
            assert_eq!(seen, (first..=TOTAL).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_snapshot_holds_last_n_events() {
        let hub = hub(2, 8, OverflowPolicy::DropOldest);
        for fact in ["a", "b", "c"] {
            hub.publish(text(fact));
        }

        let subscription = hub.subscribe().unwrap();

        assert_eq!(payloads(&subscription.snapshot), vec!["b", "c"]);
        assert_eq!(payloads(&hub.history()), vec!["b", "c"]);
    }

    #[test]
    fn test_history_never_exceeds_capacity() {
        let hub = hub(10, 8, OverflowPolicy::DropOldest);
        for i in 0..25 {
            hub.publish(text(&i.to_string()));
        }

        let snapshot = hub.subscribe().unwrap().snapshot;
        let sequences: Vec<Sequence> = snapshot.iter().map(|e| e.sequence()).collect();

        assert_eq!(sequences, (16..=25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_subscriber_sees_snapshot_then_live_event() {
        let hub = Hub::default();
        let Subscription { handle, snapshot } = hub.subscribe().unwrap();
        assert!(snapshot.is_empty());

        hub.publish(text("x"));

        match handle.recv().await {
            Some(Frame::Snapshot(envelopes)) => assert!(envelopes.is_empty()),
            other => panic!("expected empty snapshot, got {other:?}"),
        }
        match handle.recv().await {
            Some(Frame::Event(envelope)) => {
                assert_eq!(envelope.sequence(), 1);
                assert_eq!(envelope.payload().as_value(), "x");
            }
            other => panic!("expected live event, got {other:?}"),
        }
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_continuous_subscriber_receives_events_in_order_once() {
        let hub = Hub::default();
        let Subscription { handle, .. } = hub.subscribe().unwrap();

        hub.publish(text("first"));
        hub.publish(text("second"));
        hub.unsubscribe(&handle);

        let mut received = Vec::new();
        while let Some(frame) = handle.recv().await {
            if let Frame::Event(envelope) = frame {
                received.push(envelope.sequence());
            }
        }

        assert_eq!(received, vec![1, 2]);
        assert_eq!(handle.state(), SubscriberState::Closed);
    }

    #[test]
    fn test_subscribe_rejects_beyond_max_subscribers() {
        let hub = Hub::new(HubConfig {
            max_subscribers: 2,
            ..HubConfig::default()
        });
        let first = hub.subscribe().unwrap();
        let _second = hub.subscribe().unwrap();

        let err = hub.subscribe().unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::ResourceExhausted);

        hub.unsubscribe(&first.handle);
        assert!(hub.subscribe().is_ok());
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let hub = Hub::default();
        let Subscription { handle, .. } = hub.subscribe().unwrap();
        assert_eq!(hub.snapshot(), 1);

        hub.unsubscribe(&handle);
        hub.unsubscribe(&handle);

        assert_eq!(hub.snapshot(), 0);
        assert_eq!(handle.last_error(), None);
    }

    #[test]
    fn test_unsubscribed_subscriber_receives_no_new_events() {
        let hub = Hub::default();
        let Subscription { handle, .. } = hub.subscribe().unwrap();
        hub.unsubscribe(&handle);

        hub.publish(text("after"));

        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn test_drop_oldest_never_blocks_publish() {
        let hub = hub(4, 4, OverflowPolicy::DropOldest);
        let Subscription { handle, .. } = hub.subscribe().unwrap();

        // Nothing ever drains this subscriber
        for i in 0..10_000 {
            hub.publish(text(&i.to_string()));
        }

        assert_eq!(hub.snapshot(), 1);
        assert_eq!(handle.state(), SubscriberState::Active);
        assert_eq!(handle.pending(), 4);
        assert_eq!(handle.dropped(), 10_000 - 4);
    }

    #[test]
    fn test_disconnect_slow_consumer_removes_subscriber_on_overflow() {
        let hub = hub(4, 2, OverflowPolicy::DisconnectSlowConsumer);
        let Subscription { handle: slow, .. } = hub.subscribe().unwrap();

        hub.publish(text("1"));
        hub.publish(text("2"));
        assert_eq!(hub.snapshot(), 1);

        hub.publish(text("3"));

        assert_eq!(hub.snapshot(), 0);
        assert_eq!(slow.state(), SubscriberState::Closed);
        assert_eq!(slow.last_error(), Some(ErrorKind::QueueOverflow));

        // Unsubscribing after the hub closed it is still harmless
        hub.unsubscribe(&slow);
        assert_eq!(slow.last_error(), Some(ErrorKind::QueueOverflow));
    }

    #[test]
    fn test_slow_consumer_does_not_affect_others() {
        let hub = hub(4, 1, OverflowPolicy::DisconnectSlowConsumer);
        let Subscription { handle: slow, .. } = hub.subscribe().unwrap();
        let Subscription { handle: fast, .. } = hub.subscribe().unwrap();

        hub.publish(text("1"));
        // Drain the fast subscriber only
        while let crate::connection::Next::Frame(_) = fast.subscriber().next() {}
        hub.publish(text("2"));

        assert_eq!(slow.state(), SubscriberState::Closed);
        assert_eq!(fast.state(), SubscriberState::Active);
        assert_eq!(fast.pending(), 1);
        assert_eq!(hub.snapshot(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_every_subscriber() {
        let hub = Hub::default();
        let Subscription { handle, .. } = hub.subscribe().unwrap();
        hub.publish(text("pending"));

        hub.shutdown();

        assert_eq!(hub.snapshot(), 0);
        assert_eq!(handle.state(), SubscriberState::Draining);
        assert!(matches!(handle.recv().await, Some(Frame::Snapshot(_))));
        assert!(matches!(handle.recv().await, Some(Frame::Event(_))));
        assert!(handle.recv().await.is_none());
    }
}
