/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the 'proposal' type and its associated methods.
//!
//! The consensus core treats a `Proposal` as opaque: it only ever looks at its [`hash`](Proposal::hash)
//! and its [`parent`](Proposal::parent). Everything else is for the [`App`](crate::app::App).

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::{CryptoHasher, Digest},
    data_types::{BlockHeight, CryptoHash, Data},
};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    pub height: BlockHeight,
    pub hash: CryptoHash,
    pub parent: CryptoHash,
    pub data_hash: CryptoHash,
    pub data: Data,
}

impl Proposal {
    /// Create a proposal at `height` that extends the proposal identified by `parent`.
    pub fn new(height: BlockHeight, parent: CryptoHash, data: Data) -> Proposal {
        let data_hash = Proposal::data_hash(&data);
        Proposal {
            height,
            hash: Proposal::hash(height, &parent, &data_hash),
            parent,
            data_hash,
            data,
        }
    }

    pub fn hash(height: BlockHeight, parent: &CryptoHash, data_hash: &CryptoHash) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(height.int().to_le_bytes());
        hasher.update(parent.bytes());
        hasher.update(data_hash.bytes());
        CryptoHash::new(hasher.finalize().into())
    }

    pub fn data_hash(data: &Data) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(data.bytes());
        CryptoHash::new(hasher.finalize().into())
    }

    /// Checks if `hash` and `data_hash` are the digests of the proposal's contents.
    pub fn is_correct(&self) -> bool {
        self.data_hash == Proposal::data_hash(&self.data)
            && self.hash == Proposal::hash(self.height, &self.parent, &self.data_hash)
    }
}
