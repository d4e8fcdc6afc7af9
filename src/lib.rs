/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A per-validator consensus core for basic (non-chained) HotStuff.
//!
//! Each validator runs a [`Core`](hotstuff::implementation::Core) that drives one proposal per round
//! through the Prepare, PreCommit and Commit phases, aggregates votes into quorum certificates, defers
//! messages for future rounds into a backlog, and abandons rounds that time out.
//!
//! Start with [`replica`] to run a core on its own thread, or drive a core directly through its
//! `handle_*` methods.

pub mod app;

pub mod hotstuff;

pub mod networking;

pub mod pacemaker;

pub mod event_bus;

pub mod events;

pub mod logging;

pub mod replica;

pub mod types;

pub(crate) mod algorithm;
