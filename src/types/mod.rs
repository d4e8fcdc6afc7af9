/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that are used across multiple components of the consensus core.
//!
//! Types specific to the HotStuff protocol itself (phases, quorum certificates, wire messages) live
//! in [`crate::hotstuff`].

pub mod data_types;

pub mod crypto_primitives;

pub mod proposal;

pub mod validator_set;
