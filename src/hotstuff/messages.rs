/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Messages sent between replicas by the HotStuff protocol.
//!
//! Every message travels inside a signed [`Message`] envelope:
//!
//! ```text
//! borsh((code: u8, round: Round, signer: [u8; 32], payload: Vec<u8>, signature: [u8; 64]))
//! ```
//!
//! The signature covers everything before it. The payload is the borsh encoding of the typed message
//! that `code` names: [`NewView`], [`Prepare`], [`PreCommit`], [`Commit`], [`Decide`], or a [`Vote`].

use std::io;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    crypto_primitives::{verify_signature, verifying_key_from_bytes, Keypair, VerifyingKey},
    data_types::{CryptoHash, Round, SignatureBytes, VerifyingKeyBytes},
    proposal::Proposal,
};

use super::types::{vote_signing_bytes, Phase, QuorumCertificate};

/// Wire identifier of the typed message carried in a [`Message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageCode {
    NewView,
    Prepare,
    PrepareVote,
    PreCommit,
    PreCommitVote,
    Commit,
    CommitVote,
    Decide,
}

impl MessageCode {
    /// Parse a code read off the wire. Returns `None` for bytes that name no message kind.
    pub fn from_u8(code: u8) -> Option<MessageCode> {
        match code {
            0 => Some(MessageCode::NewView),
            1 => Some(MessageCode::Prepare),
            2 => Some(MessageCode::PrepareVote),
            3 => Some(MessageCode::PreCommit),
            4 => Some(MessageCode::PreCommitVote),
            5 => Some(MessageCode::Commit),
            6 => Some(MessageCode::CommitVote),
            7 => Some(MessageCode::Decide),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The phase a vote with this code is cast in. `None` if this code is not a vote.
    pub fn vote_phase(self) -> Option<Phase> {
        match self {
            MessageCode::PrepareVote => Some(Phase::Prepare),
            MessageCode::PreCommitVote => Some(Phase::PreCommit),
            MessageCode::CommitVote => Some(Phase::Commit),
            _ => None,
        }
    }

    /// The code of a vote cast in `phase`. `None` for phases that are not voted on.
    pub fn vote_for(phase: Phase) -> Option<MessageCode> {
        match phase {
            Phase::Prepare => Some(MessageCode::PrepareVote),
            Phase::PreCommit => Some(MessageCode::PreCommitVote),
            Phase::Commit => Some(MessageCode::CommitVote),
            Phase::NewView | Phase::Decide => None,
        }
    }
}

impl std::fmt::Display for MessageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The signed envelope every consensus message travels in.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Message {
    pub code: u8,
    pub round: Round,
    pub signer: VerifyingKeyBytes,
    pub payload: Vec<u8>,
    pub signature: SignatureBytes,
}

impl Message {
    /// Wrap `payload` in an envelope signed by `keypair`.
    pub fn new(keypair: &Keypair, code: MessageCode, round: Round, payload: Vec<u8>) -> Message {
        let signer = keypair.public().to_bytes();
        let signature = keypair.sign(&Message::signing_bytes(
            code.as_u8(),
            round,
            &signer,
            &payload,
        ));
        Message {
            code: code.as_u8(),
            round,
            signer,
            payload,
            signature,
        }
    }

    /// Create a message carrying `typed` under `code`.
    pub fn wrap<T: BorshSerialize>(
        keypair: &Keypair,
        code: MessageCode,
        round: Round,
        typed: &T,
    ) -> Message {
        Message::new(keypair, code, round, encode(typed))
    }

    /// Get the bytes the signer signs: `borsh((code, round, signer, payload))`.
    pub fn signing_bytes(
        code: u8,
        round: Round,
        signer: &VerifyingKeyBytes,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 8 + 32 + 4 + payload.len());
        bytes.push(code);
        bytes.extend_from_slice(&round.int().to_le_bytes());
        bytes.extend_from_slice(signer);
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Parse raw bytes received from the network into a message, and recover its signer.
    ///
    /// Fails if the bytes are not a well-formed envelope, if the signer field is not a valid
    /// verifying key, or if the signature does not verify against it.
    pub fn from_payload(bytes: &[u8]) -> Result<(Message, VerifyingKey), EnvelopeError> {
        let message = Message::try_from_slice(bytes).map_err(|_| EnvelopeError::Malformed)?;
        let signer =
            verifying_key_from_bytes(&message.signer).ok_or(EnvelopeError::InvalidSignerKey)?;
        let signing_bytes =
            Message::signing_bytes(message.code, message.round, &message.signer, &message.payload);
        if !verify_signature(&signer, &signing_bytes, &message.signature) {
            return Err(EnvelopeError::BadSignature);
        }
        Ok((message, signer))
    }

    /// Serialize the message into the bytes that are handed to the network.
    pub fn to_payload(&self) -> Vec<u8> {
        encode(self)
    }

    /// The typed code of this message, or `None` if `code` names no message kind.
    pub fn message_code(&self) -> Option<MessageCode> {
        MessageCode::from_u8(self.code)
    }

    /// Deserialize the payload as a `T`.
    pub fn decode<T: BorshDeserialize>(&self) -> io::Result<T> {
        T::try_from_slice(&self.payload)
    }
}

/// The ways raw bytes can fail to become a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeError {
    Malformed,
    InvalidSignerKey,
    BadSignature,
}

/// Sent by every replica to the proposer of the round it just entered.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct NewView {
    pub high_qc: QuorumCertificate,
}

/// Broadcast by the proposer once it has collected a quorum of [`NewView`]s.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Prepare {
    pub proposal: Proposal,
    /// The highest QC among the NewViews the proposer collected. `proposal` extends its digest.
    pub high_qc: QuorumCertificate,
}

/// Broadcast by the proposer once Prepare votes for the proposal form a QC.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PreCommit {
    pub prepare_qc: QuorumCertificate,
}

/// Broadcast by the proposer once PreCommit votes for the proposal form a QC.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Commit {
    pub precommit_qc: QuorumCertificate,
}

/// Broadcast by the proposer once Commit votes for the proposal form a QC. Replicas that receive
/// it execute the proposal.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Decide {
    pub commit_qc: QuorumCertificate,
}

/// A validator's vote for `digest` in a given `round` and `phase`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Vote {
    pub round: Round,
    pub phase: Phase,
    pub digest: CryptoHash,
    pub signature: SignatureBytes,
}

impl Vote {
    pub fn new(keypair: &Keypair, round: Round, phase: Phase, digest: CryptoHash) -> Vote {
        Vote {
            round,
            phase,
            digest,
            signature: keypair.sign(&vote_signing_bytes(round, phase, &digest)),
        }
    }

    /// Checks that `signature` was created by `signer` over this vote's round, phase and digest.
    pub fn is_correct(&self, signer: &VerifyingKey) -> bool {
        verify_signature(
            signer,
            &vote_signing_bytes(self.round, self.phase, &self.digest),
            &self.signature,
        )
    }
}

/// Borsh-serialize `value` into a fresh buffer.
pub(crate) fn encode<T: BorshSerialize>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::new();
    // Writing into a Vec<u8> does not fail.
    let _ = value.serialize(&mut bytes);
    bytes
}
