/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that determine what roles a replica should play in a given round and validator set.

use crate::types::{
    crypto_primitives::VerifyingKey,
    data_types::Round,
    validator_set::ValidatorSet,
};

/// Determine the validator that proposes in `round`.
///
/// ## Proposer selection
///
/// Proposers rotate round-robin through the validators in the
/// [order](crate::types::validator_set::ValidatorSet#ordering-of-validators) of the validator set, so
/// the proposer of round `r` is the validator at position `r mod n`. Every replica that agrees on the
/// validator set and the round agrees on the proposer.
pub(crate) fn select_proposer(round: Round, validator_set: &ValidatorSet) -> Option<VerifyingKey> {
    validator_set.proposer(round).copied()
}

/// Determine whether `replica` proposes in `round`.
pub(crate) fn is_proposer(replica: &VerifyingKey, round: Round, validator_set: &ValidatorSet) -> bool {
    select_proposer(round, validator_set).is_some_and(|proposer| &proposer == replica)
}
