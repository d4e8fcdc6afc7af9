/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The algorithm thread: the loop that feeds events to the [`Core`].
//!
//! The algorithm thread is the driving force of a replica. It owns the replica's [`Core`] and three
//! [`Subscription`]s on the replica's [`EventMux`](crate::event_bus::EventMux):
//! 1. Requests and messages, posted by the block builder and the transport.
//! 2. Final commits, posted by the core itself when it decides its round's proposal.
//! 3. Timeouts, posted by the round timer.
//!
//! Each iteration of the loop handles at most one event to completion, so the core never sees two
//! events at once. Final commits and then timeouts are checked first, since they move the core to a
//! new round and make any queued messages for the old round moot. If neither is pending, the loop waits
//! up to the poll interval for a request or message, then checks the shutdown signal again.
//!
//! When the loop exits, the core's timer is cancelled and every subscription is released before the
//! thread returns.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::app::App;
use crate::event_bus::Subscription;
use crate::events::Event;
use crate::hotstuff::implementation::Core;
use crate::networking::network::Network;

pub(crate) struct Algorithm<N: Network + 'static, A: App + 'static> {
    core: Core<N, A>,
    events: Subscription,
    final_committed: Subscription,
    timeouts: Subscription,
    poll_interval: Duration,
    shutdown_signal: Receiver<()>,
}

impl<N: Network + 'static, A: App + 'static> Algorithm<N, A> {
    pub(crate) fn new(
        core: Core<N, A>,
        events: Subscription,
        final_committed: Subscription,
        timeouts: Subscription,
        poll_interval: Duration,
        shutdown_signal: Receiver<()>,
    ) -> Self {
        Self {
            core,
            events,
            final_committed,
            timeouts,
            poll_interval,
            shutdown_signal,
        }
    }

    pub(crate) fn start(self) -> JoinHandle<()> {
        thread::spawn(move || self.execute())
    }

    fn execute(mut self) {
        self.core.start();

        loop {
            match self.shutdown_signal.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => (),
            }

            match self.final_committed.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    continue;
                }
                Err(TryRecvError::Empty) => (),
                Err(TryRecvError::Disconnected) => {
                    log::error!("FinalCommitted subscription disconnected from the event mux");
                    break;
                }
            }

            match self.timeouts.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    continue;
                }
                Err(TryRecvError::Empty) => (),
                Err(TryRecvError::Disconnected) => {
                    log::error!("Timeout subscription disconnected from the event mux");
                    break;
                }
            }

            match self.events.recv_timeout(self.poll_interval) {
                Ok(event) => self.handle_event(event),
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => {
                    log::error!("Event subscription disconnected from the event mux");
                    break;
                }
            }
        }

        self.core.stop();
        self.events.unsubscribe();
        self.final_committed.unsubscribe();
        self.timeouts.unsubscribe();
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Request(request) => {
                self.core.handle_request(request.proposal);
            }
            Event::Message(message) => {
                self.core.handle_msg(&message.payload);
            }
            Event::FinalCommitted(final_committed) => {
                self.core.handle_final_committed(final_committed.round)
            }
            Event::Timeout(timeout) => self.core.handle_timeout(timeout.round),
        }
    }
}
