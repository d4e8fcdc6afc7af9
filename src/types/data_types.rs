/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes or numbers, and do not have any major "active" behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Add,
};

use borsh::{BorshDeserialize, BorshSerialize};

/// Number of a consensus round.
///
/// Every replica starts at round 0, and its current round only ever increases: either by one when
/// the round times out, or by one when the round's proposal is committed.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct Round(u64);

impl Round {
    /// Create a new `Round` with an `int` value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// The round every replica starts in.
    pub const fn init() -> Self {
        Self(0)
    }

    /// Get the `u64` value of this `Round`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the round immediately before this one, saturating at round 0.
    pub fn saturating_prev(&self) -> Round {
        Round(self.0.saturating_sub(1))
    }
}

impl Display for Round {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for Round {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Add<u64> for Round {
    type Output = Round;

    fn add(self, rhs: u64) -> Self::Output {
        Round(self.0.add(rhs))
    }
}

/// Height of a proposal in the chain of proposals.
///
/// The first proposal, whose parent is the [zero digest](CryptoHash::zero), has height 0.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Create a new `BlockHeight` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `BlockHeight`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add<u64> for BlockHeight {
    type Output = BlockHeight;

    fn add(self, rhs: u64) -> Self::Output {
        BlockHeight(self.0.add(rhs))
    }
}

/// 32-byte cryptographic digest, produced by the [`CryptoHasher`](super::crypto_primitives::CryptoHasher).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zero digest. It is the parent of the first proposal and the digest of the genesis QC.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Get the bytes of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Opaque payload of a [`Proposal`](super::proposal::Proposal), produced by the block builder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct Data(Vec<u8>);

impl Data {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ed25519 signature represented in bytes.
#[derive(Clone, Copy, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct SignatureBytes([u8; 64]);

impl SignatureBytes {
    /// Create a new `SignatureBytes` wrapping `bytes`.
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the bytes of this `SignatureBytes`.
    pub const fn bytes(&self) -> [u8; 64] {
        self.0
    }
}

impl Debug for SignatureBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0[..], f)
    }
}

/// Ed25519 verifying key represented in bytes. This is how signers are identified on the wire.
pub type VerifyingKeyBytes = [u8; 32];

/// Set of signatures, represented as a vector with the size of a given validator set.
///
/// The value at a particular position is either:
/// 1. `None`: if a signature from the validator at that position has not been collected, or
/// 2. `Some(signature_bytes)`: if `signature_bytes` was collected from the validator at that position.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct SignatureSet(Vec<Option<SignatureBytes>>);

impl SignatureSet {
    /// Create an empty signature set, with no positions at all.
    pub const fn init() -> Self {
        Self(Vec::new())
    }

    /// Create a signature set with `len` empty positions.
    pub fn new(len: usize) -> Self {
        Self(vec![None; len])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Option<SignatureBytes>> {
        self.0.iter()
    }

    pub fn get(&self, pos: usize) -> Option<&SignatureBytes> {
        self.0.get(pos).and_then(|signature| signature.as_ref())
    }

    pub(crate) fn set(&mut self, pos: usize, value: Option<SignatureBytes>) {
        if let Some(slot) = self.0.get_mut(pos) {
            *slot = value
        }
    }

    /// Number of positions, i.e., the size of the validator set this signature set was created for.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of positions that hold a signature.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|signature| signature.is_some()).count()
    }
}
