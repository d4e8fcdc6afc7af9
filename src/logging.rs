/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs in the [`info`] and [`debug`] modules are printed if the user enabled them via the
//! replica's [config](crate::replica::Configuration). The logs in the [`warn`] module, which report
//! messages the replica rejected, are always printed.
//!
//! The consensus core logs using the [log](https://docs.rs/log/latest/log/) crate. To get these
//! messages printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the event in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a proposal is printed:
//!
//! ```text
//! Propose, 1701329264, 4, fNGCJyk, 2
//! ```
//!
//! In the snippet:
//! - The third value is the round the proposal is made in.
//! - The fourth value is the first seven characters of the Base64 encoding of the proposal's hash.
//! - The fifth value is the height of the proposal.

use std::time::{Duration, SystemTime};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::hotstuff::{implementation::HotStuffError, messages::MessageCode, types::Phase};
use crate::types::{
    crypto_primitives::VerifyingKey,
    data_types::{BlockHeight, CryptoHash, Round},
};

// Names of each event in PascalCase for printing:
pub const START_ROUND: &str = "StartRound";
pub const ROUND_TIMEOUT: &str = "RoundTimeout";
pub const PROPOSE: &str = "Propose";
pub const VOTE: &str = "Vote";
pub const NEW_VIEW: &str = "NewView";
pub const COLLECT_QC: &str = "CollectQC";
pub const UPDATE_HIGH_QC: &str = "UpdateHighQC";
pub const UPDATE_LOCKED_QC: &str = "UpdateLockedQC";
pub const COMMIT_PROPOSAL: &str = "CommitProposal";
pub const UPDATE_VALIDATOR_SET: &str = "UpdateValidatorSet";

pub const RECEIVE_MESSAGE: &str = "ReceiveMessage";
pub const STORE_BACKLOG: &str = "StoreBacklog";
pub const DRAIN_BACKLOG: &str = "DrainBacklog";
pub const EVICT_BACKLOG: &str = "EvictBacklog";
pub const NO_VALID_REQUEST: &str = "NoValidRequest";
pub const STALE_EVENT: &str = "StaleEvent";

pub const REJECT_MESSAGE: &str = "RejectMessage";

pub(crate) mod info {
    use super::*;

    pub(crate) fn start_round(round: Round, proposer: Option<&VerifyingKey>, timeout: Duration) {
        log::info!(
            "{}, {}, {}, {}, {}",
            START_ROUND,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            proposer.map_or_else(|| String::from("-"), |proposer| first_seven_base64_chars(&proposer.to_bytes())),
            timeout.as_millis()
        )
    }

    pub(crate) fn round_timeout(round: Round, phase: Phase) {
        log::info!(
            "{}, {}, {}, {}",
            ROUND_TIMEOUT,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            phase
        )
    }

    pub(crate) fn propose(round: Round, proposal: &CryptoHash, height: BlockHeight) {
        log::info!(
            "{}, {}, {}, {}, {}",
            PROPOSE,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            first_seven_base64_chars(&proposal.bytes()),
            height
        )
    }

    pub(crate) fn collect_qc(round: Round, phase: Phase, digest: &CryptoHash, signatures: usize) {
        log::info!(
            "{}, {}, {}, {}, {}, {}",
            COLLECT_QC,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            phase,
            first_seven_base64_chars(&digest.bytes()),
            signatures
        )
    }

    pub(crate) fn commit_proposal(round: Round, proposal: &CryptoHash, height: BlockHeight) {
        log::info!(
            "{}, {}, {}, {}, {}",
            COMMIT_PROPOSAL,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            first_seven_base64_chars(&proposal.bytes()),
            height
        )
    }

    pub(crate) fn update_validator_set(round: Round, validators: usize) {
        log::info!(
            "{}, {}, {}, {}",
            UPDATE_VALIDATOR_SET,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            validators
        )
    }
}

pub(crate) mod debug {
    use super::*;

    pub(crate) fn receive_message(code: MessageCode, round: Round, sender: &VerifyingKey) {
        log::debug!(
            "{}, {}, {}, {}, {}",
            RECEIVE_MESSAGE,
            secs_since_unix_epoch(SystemTime::now()),
            code,
            round,
            first_seven_base64_chars(&sender.to_bytes())
        )
    }

    pub(crate) fn vote(round: Round, phase: Phase, digest: &CryptoHash) {
        log::debug!(
            "{}, {}, {}, {}, {}",
            VOTE,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            phase,
            first_seven_base64_chars(&digest.bytes())
        )
    }

    pub(crate) fn new_view(round: Round, high_qc_round: Round, high_qc_digest: &CryptoHash) {
        log::debug!(
            "{}, {}, {}, {}, {}",
            NEW_VIEW,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            high_qc_round,
            first_seven_base64_chars(&high_qc_digest.bytes())
        )
    }

    pub(crate) fn update_high_qc(round: Round, digest: &CryptoHash) {
        log::debug!(
            "{}, {}, {}, {}",
            UPDATE_HIGH_QC,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            first_seven_base64_chars(&digest.bytes())
        )
    }

    pub(crate) fn update_locked_qc(round: Round, digest: &CryptoHash) {
        log::debug!(
            "{}, {}, {}, {}",
            UPDATE_LOCKED_QC,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            first_seven_base64_chars(&digest.bytes())
        )
    }

    pub(crate) fn store_backlog(round: Round, sender: &VerifyingKey, stored: usize) {
        log::debug!(
            "{}, {}, {}, {}, {}",
            STORE_BACKLOG,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            first_seven_base64_chars(&sender.to_bytes()),
            stored
        )
    }

    pub(crate) fn drain_backlog(round: Round, drained: usize) {
        log::debug!(
            "{}, {}, {}, {}",
            DRAIN_BACKLOG,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            drained
        )
    }

    pub(crate) fn no_valid_request(round: Round, high_qc_digest: &CryptoHash) {
        log::debug!(
            "{}, {}, {}, {}",
            NO_VALID_REQUEST,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            first_seven_base64_chars(&high_qc_digest.bytes())
        )
    }

    pub(crate) fn stale_event(kind: &str, event_round: Round, current_round: Round) {
        log::debug!(
            "{}, {}, {}, {}, {}",
            STALE_EVENT,
            secs_since_unix_epoch(SystemTime::now()),
            kind,
            event_round,
            current_round
        )
    }
}

pub(crate) mod warn {
    use super::*;

    pub(crate) fn reject_message(
        phase: Phase,
        round: Round,
        sender: Option<&VerifyingKey>,
        error: &HotStuffError,
    ) {
        log::warn!(
            "{}, {}, {}, {}, {}, {}",
            REJECT_MESSAGE,
            secs_since_unix_epoch(SystemTime::now()),
            phase,
            round,
            sender.map_or_else(|| String::from("-"), |sender| first_seven_base64_chars(&sender.to_bytes())),
            error
        )
    }

    pub(crate) fn evict_backlog(round: Round, sender: &VerifyingKey) {
        log::warn!(
            "{}, {}, {}, {}",
            EVICT_BACKLOG,
            secs_since_unix_epoch(SystemTime::now()),
            round,
            first_seven_base64_chars(&sender.to_bytes())
        )
    }
}

fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}
