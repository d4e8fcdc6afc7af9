/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Holding area for messages that arrive for a round the replica has not reached yet.
//!
//! The [`Core`](super::implementation::Core) [stores](Backlog::store) a message here when its round is
//! ahead of the current round, and [drains](Backlog::drain) the entries for a round right after entering
//! it, feeding them through the same checks as messages that arrive on time.
//!
//! ## Bound
//!
//! The backlog holds at most `capacity` messages. When storing a message would exceed it, entries are
//! evicted starting from the front of the lowest-round queue, so a peer flooding far-future rounds
//! cannot grow the backlog without limit.

use std::collections::{BTreeMap, VecDeque};

use crate::types::{crypto_primitives::VerifyingKey, data_types::Round};

use super::messages::Message;

pub struct Backlog {
    capacity: usize,
    len: usize,
    queues: BTreeMap<Round, VecDeque<(Message, VerifyingKey)>>,
}

impl Backlog {
    /// Create an empty backlog that holds at most `capacity` messages.
    pub fn new(capacity: usize) -> Backlog {
        Self {
            capacity,
            len: 0,
            queues: BTreeMap::new(),
        }
    }

    /// Store `message`, sent by `signer`, for replay once its round becomes current.
    ///
    /// Returns the entries that had to be evicted to respect the capacity. If the capacity is zero,
    /// the message itself is returned.
    pub fn store(
        &mut self,
        message: Message,
        signer: VerifyingKey,
    ) -> Vec<(Message, VerifyingKey)> {
        if self.capacity == 0 {
            return vec![(message, signer)];
        }

        self.queues
            .entry(message.round)
            .or_default()
            .push_back((message, signer));
        self.len += 1;

        let mut evicted = Vec::new();
        while self.len > self.capacity {
            match self.pop_lowest() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
        evicted
    }

    /// Remove and return every entry stored for `round`, in insertion order. Entries for lower rounds
    /// can never become current again, so they are discarded.
    pub fn drain(&mut self, round: Round) -> Vec<(Message, VerifyingKey)> {
        let mut kept = self.queues.split_off(&round);
        let drained = match kept.remove(&round) {
            Some(queue) => Vec::from(queue),
            None => Vec::new(),
        };
        self.queues = kept;
        self.len = self.queues.values().map(VecDeque::len).sum();
        drained
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of entries stored for `round`.
    pub fn len_for(&self, round: Round) -> usize {
        self.queues.get(&round).map_or(0, VecDeque::len)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn pop_lowest(&mut self) -> Option<(Message, VerifyingKey)> {
        let mut lowest = self.queues.first_entry()?;
        let entry = lowest.get_mut().pop_front();
        if lowest.get().is_empty() {
            lowest.remove();
        }
        if entry.is_some() {
            self.len -= 1;
        }
        entry
    }
}
