/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use crate::types::{crypto_primitives::VerifyingKey, validator_set::ValidatorSet};

pub trait Network: Send {
    /// Inform the network provider of the validator set the replica votes with. Called when the
    /// replica starts, and at every round boundary at which the validator set changed.
    fn update_validator_set(&mut self, validator_set: &ValidatorSet);

    /// Send a payload to every validator, including this replica itself, without blocking.
    fn broadcast(&mut self, payload: Vec<u8>);

    /// Send a payload to the specified peer without blocking. `peer` may be this replica itself.
    fn send(&mut self, peer: VerifyingKey, payload: Vec<u8>);
}
