//! Offline send queue.
//!
//! Actions issued while the channel is down are queued here and drained
//! FIFO after the next successful reconnect. The session drains exactly
//! once per reconnect; a drain interrupted by another disconnect
//! re-queues the unsent remainder at the front so order is preserved
//! and nothing is sent twice.

use crate::{ChatEntry, LocalId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A send waiting for the channel to come back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedSend {
    /// Local id of the optimistic record this send belongs to
    pub local_id: LocalId,
    /// The entry to deliver
    pub entry: ChatEntry,
}

/// FIFO queue of sends awaiting delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbox {
    queue: VecDeque<QueuedSend>,
}

impl Outbox {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a send for the next reconnect.
    pub fn push(&mut self, local_id: LocalId, entry: ChatEntry) {
        self.queue.push_back(QueuedSend { local_id, entry });
    }

    /// Take everything queued, oldest first, leaving the outbox empty.
    pub fn drain(&mut self) -> Vec<QueuedSend> {
        self.queue.drain(..).collect()
    }

    /// Put unsent items back at the front, preserving their order.
    /// Used when a drain is interrupted by another disconnect.
    pub fn requeue_front(&mut self, unsent: Vec<QueuedSend>) {
        for item in unsent.into_iter().rev() {
            self.queue.push_front(item);
        }
    }

    /// Number of queued sends.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
