/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The set of validators that vote in consensus.

use std::slice;

use super::data_types::Round;

pub use ed25519_dalek::VerifyingKey;

/// A validator is identified by its Ed25519 verifying key, which doubles as its address.
pub type Validator = VerifyingKey;

/// Stores the identities of validators.
///
/// ## Ordering of validators
///
/// `ValidatorSet` internally maintains the list of validators in ascending order of their
/// `VerifyingKey`s. Positions in this order index [`SignatureSet`](super::data_types::SignatureSet)s
/// and select [proposers](ValidatorSet::proposer).
///
/// ## Quorum
///
/// With `n = 3f + 1` validators, the quorum size is `2f + 1`. For other values of `n`, the quorum
/// size is the smallest number of validators strictly greater than two-thirds of `n`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatorSet {
    // The verifying keys of validators are included here in ascending order.
    validators: Vec<Validator>,
}

impl ValidatorSet {
    /// Create an empty validator set.
    pub fn new() -> ValidatorSet {
        Self {
            validators: Vec::new(),
        }
    }

    /// Put `validator` into the validator set, placing it in a position that preserves the
    /// [ordering of validators](Self#ordering-of-validators). Does nothing if it is already present.
    pub fn put(&mut self, validator: &Validator) {
        let validator_bytes = validator.to_bytes();
        if let Err(insert_pos) = self
            .validators
            .binary_search_by(|v| v.to_bytes().cmp(&validator_bytes))
        {
            self.validators.insert(insert_pos, *validator);
        }
    }

    /// Remove `validator` from the validator set, returning whether it was present.
    pub fn remove(&mut self, validator: &Validator) -> bool {
        match self.position(validator) {
            Some(pos) => {
                self.validators.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Look up a validator by its address, returning its position and identity.
    pub fn get_by_address(&self, address: &VerifyingKey) -> Option<(usize, &Validator)> {
        self.position(address)
            .map(|pos| (pos, &self.validators[pos]))
    }

    /// Get the index of `validator` in the sorted order of the validator set.
    pub fn position(&self, validator: &Validator) -> Option<usize> {
        let validator_bytes = validator.to_bytes();
        self.validators
            .binary_search_by(|v| v.to_bytes().cmp(&validator_bytes))
            .ok()
    }

    /// Get an iterator through validators' verifying keys which walks through them in ascending order.
    pub fn validators(&self) -> slice::Iter<Validator> {
        self.validators.iter()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Number of distinct validators whose votes form a quorum.
    pub fn quorum_size(&self) -> usize {
        self.len() * 2 / 3 + 1
    }

    /// The validator that drives `round`. Proposers rotate through the validators in key order.
    ///
    /// Returns `None` only if the validator set is empty.
    pub fn proposer(&self, round: Round) -> Option<&Validator> {
        if self.validators.is_empty() {
            return None;
        }
        let index = (round.int() % self.validators.len() as u64) as usize;
        self.validators.get(index)
    }
}

impl FromIterator<Validator> for ValidatorSet {
    fn from_iter<I: IntoIterator<Item = Validator>>(iter: I) -> Self {
        let mut validator_set = ValidatorSet::new();
        for validator in iter {
            validator_set.put(&validator);
        }
        validator_set
    }
}
