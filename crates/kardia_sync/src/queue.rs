//! Bounded outbound queue for sends attempted while the channel is down.
//!
//! FIFO up to a configured depth; beyond that the oldest queued send is
//! dropped and counted. Loss past the bound is acceptable, blocking the
//! caller is not.

use crate::message::ClientMessage;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct SendQueue {
    items: VecDeque<ClientMessage>,
    depth: usize,
    dropped: u64,
}

impl SendQueue {
    pub fn new(depth: usize) -> Self {
        Self {
            items: VecDeque::new(),
            depth: depth.max(1),
            dropped: 0,
        }
    }

    /// Enqueue a send. If the queue is at depth, the oldest entry is dropped
    /// and the loss is logged and counted.
    pub fn push(&mut self, msg: ClientMessage) {
        if self.items.len() >= self.depth {
            self.items.pop_front();
            self.dropped += 1;
            tracing::warn!(
                depth = self.depth,
                dropped_total = self.dropped,
                "Outbound queue full, dropping oldest queued send"
            );
        }
        self.items.push_back(msg);
    }

    /// Take everything, in original order.
    pub fn drain(&mut self) -> Vec<ClientMessage> {
        self.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total sends lost to the depth bound since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
