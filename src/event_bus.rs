/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A multiplexer that fans [`Event`]s out to subscribers.
//!
//! Every [`Subscription`] names the [`EventKind`]s it is interested in and receives, in posting order,
//! every event of those kinds posted after it was created. Posting never blocks: each subscriber owns
//! an unbounded channel.
//!
//! The [`Core`](crate::hotstuff::implementation::Core) is driven through three subscriptions on one
//! mux: one for requests and messages, one for final commits, and one for timeouts.

use std::sync::{
    mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
    Arc, Mutex, MutexGuard,
};
use std::time::Duration;

use crate::events::{Event, EventKind};

#[derive(Clone, Default)]
pub struct EventMux {
    state: Arc<Mutex<MuxState>>,
}

#[derive(Default)]
struct MuxState {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    id: u64,
    kinds: Vec<EventKind>,
    sender: Sender<Event>,
}

impl EventMux {
    pub fn new() -> EventMux {
        Self::default()
    }

    /// Start receiving every event of the given `kinds` posted from now on.
    pub fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push(Subscriber {
            id,
            kinds: kinds.to_vec(),
            sender,
        });

        Subscription {
            id,
            receiver,
            mux: self.clone(),
            unsubscribed: false,
        }
    }

    /// Deliver `event` to every subscriber interested in its kind. Subscribers whose receiving end
    /// is gone are dropped.
    pub fn post(&self, event: Event) {
        let kind = event.kind();
        let mut state = self.lock();
        state.subscribers.retain(|subscriber| {
            !subscriber.kinds.contains(&kind) || subscriber.sender.send(event.clone()).is_ok()
        });
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.lock().subscribers.retain(|subscriber| subscriber.id != id);
    }

    // A panic while holding the lock leaves the subscriber list intact, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, MuxState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Receiving end of a subscription on an [`EventMux`]. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    receiver: Receiver<Event>,
    mux: EventMux,
    unsubscribed: bool,
}

impl Subscription {
    /// Receive the next event without blocking.
    pub fn try_recv(&self) -> Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive the next event, blocking for at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Event, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Stop receiving events. Events already delivered can still be received. Calling this more than
    /// once has no further effect.
    pub fn unsubscribe(&mut self) {
        if !self.unsubscribed {
            self.mux.unsubscribe(self.id);
            self.unsubscribed = true;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe()
    }
}
