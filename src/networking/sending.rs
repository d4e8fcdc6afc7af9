/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for sending messages to the P2P network.

use crate::hotstuff::messages::Message;
use crate::types::{crypto_primitives::VerifyingKey, validator_set::ValidatorSet};

use super::network::Network;

/// Handle for sending and broadcasting [`Message`]s to the [`Network`]. Messages are serialized into
/// their wire form here.
pub(crate) struct SenderHandle<N: Network> {
    network: N,
}

impl<N: Network> SenderHandle<N> {
    pub(crate) fn new(network: N) -> Self {
        Self { network }
    }

    pub(crate) fn send(&mut self, peer: VerifyingKey, msg: &Message) {
        self.network.send(peer, msg.to_payload())
    }

    pub(crate) fn broadcast(&mut self, msg: &Message) {
        self.network.broadcast(msg.to_payload())
    }

    pub(crate) fn update_validator_set(&mut self, validator_set: &ValidatorSet) {
        self.network.update_validator_set(validator_set)
    }
}
