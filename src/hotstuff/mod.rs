/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Subprotocol for committing [`Proposal`](crate::types::proposal::Proposal)s.
//!
//! ## Basic HotStuff
//!
//! This module implements the non-pipelined version of HotStuff. Every round decides at most one
//! proposal, and voting for it proceeds in three phases that are each certified by a
//! [`QuorumCertificate`](types::QuorumCertificate) before the next one starts:
//! 1. "Prepare" phase: the proposer broadcasts a [`Prepare`](messages::Prepare) with its proposal and
//!    the highest QC it knows of, replicas send [`Prepare`](types::Phase::Prepare) votes.
//! 2. "PreCommit" phase: the proposer broadcasts a [`PreCommit`](messages::PreCommit) with the prepareQC,
//!    replicas update their highest QC and send [`PreCommit`](types::Phase::PreCommit) votes.
//! 3. "Commit" phase: the proposer broadcasts a [`Commit`](messages::Commit) with the precommitQC,
//!    replicas lock on it and send [`Commit`](types::Phase::Commit) votes.
//!
//! Finally, the proposer broadcasts a [`Decide`](messages::Decide) with the commitQC, and every replica
//! that receives it commits the proposal and moves on to the next round.
//!
//! ## Safety
//!
//! A replica that locked on a precommitQC only votes for proposals that extend the locked proposal,
//! unless the proposer justifies its proposal with a QC from a round later than the lock.
//!
//! ## Rejection
//!
//! Messages that fail any check are rejected with a [`HotStuffError`](implementation::HotStuffError)
//! and leave the replica's state untouched. No message, however malformed, can stop the replica from
//! handling the next one.

pub mod implementation;

pub mod messages;

pub mod types;

pub mod backlog;

pub(crate) mod roles;

pub(crate) mod safety;
