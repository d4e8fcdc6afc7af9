/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of types specific to the HotStuff protocol: [`Phase`]s, [`QuorumCertificate`]s, and the
//! collectors that turn votes into certificates.

use std::collections::{BTreeMap, HashMap, HashSet};

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

use crate::types::{
    crypto_primitives::{verify_signature, VerifyingKey},
    data_types::{CryptoHash, Round, SignatureBytes, SignatureSet},
    validator_set::ValidatorSet,
};

/// Step within a round.
///
/// A round starts in `NewView`, and a replica moves through `Prepare`, `PreCommit`, `Commit` and
/// `Decide` as it votes for the round's proposal. Only `Prepare`, `PreCommit` and `Commit` votes are
/// aggregated into quorum certificates.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub enum Phase {
    NewView,
    Prepare,
    PreCommit,
    Commit,
    Decide,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Get the bytes that a validator signs to vote for `digest` in the given `round` and `phase`.
///
/// The layout is that of `borsh((round, phase, digest))`: the round as a little-endian `u64`, the
/// phase as a one-byte variant index, then the 32 digest bytes.
pub(crate) fn vote_signing_bytes(round: Round, phase: Phase, digest: &CryptoHash) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + 1 + 32);
    bytes.extend_from_slice(&round.int().to_le_bytes());
    bytes.push(phase as u8);
    bytes.extend_from_slice(&digest.bytes());
    bytes
}

/// Proof that at least a quorum of validators voted for `digest` in a given `round` and `phase`.
///
/// QCs form a chain over a single proposal: the Commit-phase QC for a digest is collected only after
/// the PreCommit-phase QC for the same digest, which in turn follows the Prepare-phase QC.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct QuorumCertificate {
    pub round: Round,
    pub phase: Phase,
    pub digest: CryptoHash,
    pub signatures: SignatureSet,
}

impl QuorumCertificate {
    /// The QC every replica starts with. It certifies the zero digest, which is the parent of the
    /// first proposal, and is valid without any signatures.
    pub const fn genesis_qc() -> QuorumCertificate {
        QuorumCertificate {
            round: Round::init(),
            phase: Phase::Prepare,
            digest: CryptoHash::zero(),
            signatures: SignatureSet::init(),
        }
    }

    pub fn is_genesis_qc(&self) -> bool {
        *self == Self::genesis_qc()
    }

    /// Whether this QC should replace `other` as a replica's highest QC.
    pub fn ranks_above(&self, other: &QuorumCertificate) -> bool {
        self.round > other.round || (other.is_genesis_qc() && !self.is_genesis_qc())
    }

    /// Checks that the signature set lines up with `validator_set`, that every signature in it is
    /// correct, and that the signatures form a quorum.
    ///
    /// The genesis QC is always correct.
    pub fn verify(&self, validator_set: &ValidatorSet) -> Result<(), QCError> {
        if self.is_genesis_qc() {
            return Ok(());
        }

        if self.signatures.len() != validator_set.len() {
            return Err(QCError::InvalidParticipant {
                signature_slots: self.signatures.len(),
                validators: validator_set.len(),
            });
        }

        let message = vote_signing_bytes(self.round, self.phase, &self.digest);
        let mut signers = 0;
        for (position, (signature, signer)) in self
            .signatures
            .iter()
            .zip(validator_set.validators())
            .enumerate()
        {
            if let Some(signature) = signature {
                if !verify_signature(signer, &message, signature) {
                    return Err(QCError::InvalidSignature { position });
                }
                signers += 1;
            }
        }

        if signers < validator_set.quorum_size() {
            return Err(QCError::InsufficientSignatures {
                collected: signers,
                required: validator_set.quorum_size(),
            });
        }

        Ok(())
    }

    /// Get the verifying keys of the validators that contributed to this QC.
    pub fn signers<'a>(&self, validator_set: &'a ValidatorSet) -> Vec<&'a VerifyingKey> {
        self.signatures
            .iter()
            .zip(validator_set.validators())
            .filter_map(|(signature, signer)| signature.map(|_| signer))
            .collect()
    }
}

/// The ways a [`QuorumCertificate`] can fail verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QCError {
    #[error("qc has {signature_slots} signature slots but the validator set has {validators} validators")]
    InvalidParticipant {
        signature_slots: usize,
        validators: usize,
    },

    #[error("qc signature at position {position} does not verify")]
    InvalidSignature { position: usize },

    #[error("qc carries {collected} signatures, {required} are required")]
    InsufficientSignatures { collected: usize, required: usize },

    #[error("qc is for phase {found}, expected {expected}")]
    UnexpectedPhase { expected: Phase, found: Phase },
}

/// Result of adding a vote to the [`VoteAggregator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was recorded, but no new QC was formed.
    Pending,

    /// The vote completed a quorum for the first time. Contains the new QC.
    Certified(QuorumCertificate),
}

/// The ways adding a vote can fail. None of them change the aggregator's state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("signer is not in the validator set")]
    UnknownSigner,

    #[error("vote signature does not verify")]
    InvalidSignature,

    #[error("validator {position} already voted in round {round}, phase {phase}")]
    DuplicateVote {
        round: Round,
        phase: Phase,
        position: usize,
    },
}

/// Votes collected for a single `(round, phase)`.
#[derive(Default)]
struct Tally {
    /// Position of every validator that voted, and the digest it voted for.
    voters: HashMap<usize, CryptoHash>,
    signature_sets: HashMap<CryptoHash, SignatureSet>,
    certified: bool,
}

/// Accumulates votes keyed by `(round, phase)` and forms a [`QuorumCertificate`] once votes from a
/// quorum of distinct validators for the same digest have been collected.
///
/// A validator gets one vote per `(round, phase)`: a second vote, whether it repeats the first or
/// conflicts with it, is rejected. A QC is returned exactly once per `(round, phase)`; votes that arrive
/// after that are still recorded.
pub struct VoteAggregator {
    validator_set: ValidatorSet,
    tallies: BTreeMap<(Round, Phase), Tally>,
}

impl VoteAggregator {
    pub fn new(validator_set: ValidatorSet) -> Self {
        Self {
            validator_set,
            tallies: BTreeMap::new(),
        }
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    /// Switch to collecting votes from `validator_set`. If it differs from the current one, every
    /// tally is dropped, since signature positions are no longer comparable.
    pub fn update_validator_set(&mut self, validator_set: &ValidatorSet) -> bool {
        if &self.validator_set == validator_set {
            return false;
        }
        self.validator_set = validator_set.clone();
        self.tallies.clear();
        true
    }

    /// Add a vote by `signer` for `digest` in `round` and `phase`.
    pub fn add_vote(
        &mut self,
        round: Round,
        phase: Phase,
        digest: CryptoHash,
        signer: &VerifyingKey,
        signature: SignatureBytes,
    ) -> Result<VoteOutcome, AggregationError> {
        let position = self
            .validator_set
            .position(signer)
            .ok_or(AggregationError::UnknownSigner)?;

        if !verify_signature(
            signer,
            &vote_signing_bytes(round, phase, &digest),
            &signature,
        ) {
            return Err(AggregationError::InvalidSignature);
        }

        let tally = self.tallies.entry((round, phase)).or_default();
        if tally.voters.contains_key(&position) {
            return Err(AggregationError::DuplicateVote {
                round,
                phase,
                position,
            });
        }
        tally.voters.insert(position, digest);

        let validators = self.validator_set.len();
        let signature_set = tally
            .signature_sets
            .entry(digest)
            .or_insert_with(|| SignatureSet::new(validators));
        signature_set.set(position, Some(signature));

        if !tally.certified && signature_set.count() >= self.validator_set.quorum_size() {
            tally.certified = true;
            return Ok(VoteOutcome::Certified(QuorumCertificate {
                round,
                phase,
                digest,
                signatures: signature_set.clone(),
            }));
        }

        Ok(VoteOutcome::Pending)
    }

    /// Number of distinct validators whose votes were recorded for `(round, phase)`.
    pub fn vote_count(&self, round: Round, phase: Phase) -> usize {
        self.tallies
            .get(&(round, phase))
            .map_or(0, |tally| tally.voters.len())
    }

    /// Whether a QC was already formed for `(round, phase)`.
    pub fn is_certified(&self, round: Round, phase: Phase) -> bool {
        self.tallies
            .get(&(round, phase))
            .is_some_and(|tally| tally.certified)
    }

    /// Drop tallies for rounds older than `current_round - 1`.
    pub fn prune(&mut self, current_round: Round) {
        let oldest_kept = current_round.saturating_prev();
        self.tallies.retain(|(round, _), _| *round >= oldest_kept);
    }
}

/// Keeps track of the validators that sent a [`NewView`](super::messages::NewView) to this replica
/// for one round, and of the highest QC they reported.
pub(crate) struct NewViewCollector {
    collected_from: HashSet<usize>,
    highest_qc: QuorumCertificate,
    quorum_reached: bool,
}

impl NewViewCollector {
    pub(crate) fn new() -> NewViewCollector {
        Self {
            collected_from: HashSet::new(),
            highest_qc: QuorumCertificate::genesis_qc(),
            quorum_reached: false,
        }
    }

    /// Note that the validator at `position` sent a NewView carrying `high_qc`. Returns `true` exactly
    /// once: when this call makes the collected NewViews reach a quorum.
    pub(crate) fn collect(
        &mut self,
        round: Round,
        position: usize,
        high_qc: QuorumCertificate,
        validator_set: &ValidatorSet,
    ) -> Result<bool, AggregationError> {
        if !self.collected_from.insert(position) {
            return Err(AggregationError::DuplicateVote {
                round,
                phase: Phase::NewView,
                position,
            });
        }

        if high_qc.ranks_above(&self.highest_qc) {
            self.highest_qc = high_qc;
        }

        if !self.quorum_reached && self.collected_from.len() >= validator_set.quorum_size() {
            self.quorum_reached = true;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn quorum_reached(&self) -> bool {
        self.quorum_reached
    }

    pub(crate) fn highest_qc(&self) -> &QuorumCertificate {
        &self.highest_qc
    }
}
