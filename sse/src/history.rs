use events::Envelope;
use std::collections::VecDeque;
use std::sync::Arc;

/// Bounded ring of the most recently published envelopes.
///
/// Envelopes are pushed in sequence order and evicted oldest first, so the
/// buffer always holds the last `capacity` envelopes in publish order.
#[derive(Debug)]
pub struct History {
    capacity: usize,
    entries: VecDeque<Arc<Envelope>>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an envelope, evicting the oldest one when full.
    pub fn push(&mut self, envelope: Arc<Envelope>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(envelope);
    }

    /// Copy of the buffered envelopes, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<Envelope>> {
        self.entries.iter().cloned().collect()
    }
}
