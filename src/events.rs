/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events that drive the consensus core.
//!
//! Events are posted onto an [`EventMux`](crate::event_bus::EventMux) by the core's collaborators and
//! by the core itself:
//! - [`RequestEvent`]: posted by the block builder when it has a proposal for the replica to propose.
//! - [`MessageEvent`]: posted by the transport for every payload it receives from a peer.
//! - [`FinalCommittedEvent`]: posted by the core once it received a valid Decide for its round.
//! - [`TimeoutEvent`]: posted by the round timer when a round takes too long.

use std::time::SystemTime;

use crate::types::{data_types::Round, proposal::Proposal};

#[derive(Clone, Debug)]
pub enum Event {
    Request(RequestEvent),
    Message(MessageEvent),
    FinalCommitted(FinalCommittedEvent),
    Timeout(TimeoutEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Request(_) => EventKind::Request,
            Event::Message(_) => EventKind::Message,
            Event::FinalCommitted(_) => EventKind::FinalCommitted,
            Event::Timeout(_) => EventKind::Timeout,
        }
    }
}

/// Discriminant of [`Event`], used to pick which events a subscription receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Request,
    Message,
    FinalCommitted,
    Timeout,
}

#[derive(Clone, Debug)]
pub struct RequestEvent {
    pub proposal: Proposal,
}

#[derive(Clone, Debug)]
pub struct MessageEvent {
    /// The raw bytes of a [`Message`](crate::hotstuff::messages::Message) envelope.
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct FinalCommittedEvent {
    pub timestamp: SystemTime,
    pub round: Round,
}

#[derive(Clone, Debug)]
pub struct TimeoutEvent {
    pub timestamp: SystemTime,
    /// The round the timer was started for.
    pub round: Round,
}
