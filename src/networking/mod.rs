/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable peer-to-peer (P2P) networking.
//!
//! The consensus core only ever sends. Receiving is the transport's job: it posts every payload it
//! receives as a [`MessageEvent`](crate::events::MessageEvent) onto the replica's
//! [`EventMux`](crate::event_bus::EventMux).

pub mod network;

pub(crate) mod sending;

pub use network::Network;
