/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Predicates that decide whether a replica may vote for a proposal.
//!
//! ## Extend
//!
//! A Prepare message carries the proposer's highest QC. The proposal it carries must build on the
//! digest that QC certifies: either as its direct child, or by being that very proposal again (a
//! re-proposal of a proposal that was certified but never decided).
//!
//! ## SafeNode
//!
//! A replica that locked on a QC may only vote for a proposal that:
//! 1. Extends the branch of the locked digest, or
//! 2. Carries a high QC from a later round than the locked QC.
//!
//! The first condition guarantees safety when a quorum of replicas is locked on a proposal, while the
//! second guarantees liveness when the quorum has moved to a conflicting branch and there is evidence
//! of it. A replica that has not locked on anything (its locked QC is the genesis QC) accepts any
//! proposal that passes Extend.

use std::collections::HashMap;

use crate::types::{data_types::CryptoHash, proposal::Proposal};

use super::types::QuorumCertificate;

/// Check that `proposal` builds on the digest certified by `high_qc`.
pub(crate) fn extends_high_qc(proposal: &Proposal, high_qc: &QuorumCertificate) -> bool {
    proposal.parent == high_qc.digest || proposal.hash == high_qc.digest
}

/// Check whether `ancestor` is `proposal` itself or one of its ancestors, following parent links
/// through the `known` proposals.
///
/// The walk stops at the first digest that is not known, so it returns `false` for ancestors that
/// were never seen or were already pruned.
pub(crate) fn is_ancestor(
    ancestor: &CryptoHash,
    proposal: &Proposal,
    known: &HashMap<CryptoHash, Proposal>,
) -> bool {
    if &proposal.hash == ancestor || &proposal.parent == ancestor {
        return true;
    }

    let mut cursor = proposal.parent;
    // Each step moves to a strictly older proposal, so there are at most `known.len()` steps.
    for _ in 0..known.len() {
        match known.get(&cursor) {
            Some(parent) if &parent.parent == ancestor => return true,
            Some(parent) => cursor = parent.parent,
            None => return false,
        }
    }
    false
}

/// The SafeNode predicate.
pub(crate) fn safe_node(
    proposal: &Proposal,
    high_qc: &QuorumCertificate,
    locked_qc: &QuorumCertificate,
    known: &HashMap<CryptoHash, Proposal>,
) -> bool {
    locked_qc.is_genesis_qc()
        || is_ancestor(&locked_qc.digest, proposal, known)
        || high_qc.round > locked_qc.round
}
