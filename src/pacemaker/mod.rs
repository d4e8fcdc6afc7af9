/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Round timeouts.
//!
//! HotStuff can only make progress while a quorum of replicas spend long enough in the same round to
//! go through all of its phases. This module provides the mechanism that gets them there: every round
//! is given a deadline, and a replica that reaches it without deciding moves on to the next round,
//! whose proposer gets a chance to drive consensus instead.
//!
//! ## Exponentially increasing timeouts
//!
//! Every consecutive round that ends in a timeout doubles the next round's deadline, up to
//! `2^6` times the base timeout and never beyond the configured maximum. The first decided round
//! resets the deadline to the base timeout. Replicas whose clocks drift apart therefore eventually
//! overlap in a round for long enough to decide in it.
//!
//! ## Leader selection
//!
//! The proposer of a round is picked round-robin from the validator set: round `r` is proposed by the
//! validator at position `r mod n` in the [`ValidatorSet`](crate::types::validator_set::ValidatorSet).

pub mod implementation;

pub use implementation::{Pacemaker, PacemakerConfiguration, RoundTimer};
