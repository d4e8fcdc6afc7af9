/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The trait that the application replicated by consensus implements.
//!
//! The consensus core calls into the `App` at three points:
//! 1. At the start of every round, to learn the [validator set](App::validator_set) it should vote
//!    with during that round.
//! 2. When it receives a Prepare message, to let the application [validate](App::validate_proposal)
//!    the proposal before the replica votes for it.
//! 3. When a proposal is decided, to [commit](App::commit_proposal) it.
//!
//! Implementors are expected to be deterministic: every replica that calls a method with the same
//! arguments in the same state must get the same result.

use crate::hotstuff::types::QuorumCertificate;
use crate::types::{proposal::Proposal, validator_set::ValidatorSet};

pub trait App: Send {
    /// Get the validator set for the round that is about to start.
    ///
    /// Changes to the returned set take effect only at round boundaries, so quorum sizes never change
    /// in the middle of a round.
    fn validator_set(&mut self) -> ValidatorSet;

    /// Decide whether the replica should vote for `proposal`.
    fn validate_proposal(&mut self, proposal: &Proposal) -> ValidateProposalResponse;

    /// Execute `proposal`, which a quorum of validators decided on. `commit_qc` certifies the decision.
    fn commit_proposal(&mut self, proposal: &Proposal, commit_qc: &QuorumCertificate);
}

/// The application's verdict on a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidateProposalResponse {
    Valid,
    Invalid,
}
