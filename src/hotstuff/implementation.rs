/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Event-driven implementation of the HotStuff state machine.
//!
//! Main type: [`Core`].

use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use borsh::BorshDeserialize;
use thiserror::Error;

use crate::{
    app::{App, ValidateProposalResponse},
    event_bus::EventMux,
    events::{Event, FinalCommittedEvent},
    logging::{debug, info, warn},
    networking::{network::Network, sending::SenderHandle},
    pacemaker::implementation::{Pacemaker, PacemakerConfiguration},
    types::{
        crypto_primitives::{Keypair, VerifyingKey},
        data_types::{BlockHeight, CryptoHash, Round},
        proposal::Proposal,
        validator_set::ValidatorSet,
    },
};

use super::{
    backlog::Backlog,
    messages::{Commit, Decide, EnvelopeError, Message, MessageCode, NewView, PreCommit, Prepare, Vote},
    roles::{is_proposer, select_proposer},
    safety::{extends_high_qc, safe_node},
    types::{
        AggregationError, NewViewCollector, Phase, QCError, QuorumCertificate, VoteAggregator,
        VoteOutcome,
    },
};

/// A single validator's participant in the HotStuff protocol.
///
/// # Usage
///
/// After creating an instance of `Core` using [`new`](Self::new) and entering round 0 with
/// [`start`](Self::start), the caller feeds it events, one at a time:
/// 1. [`handle_request`](Self::handle_request): a proposal the block builder wants proposed.
/// 2. [`handle_msg`](Self::handle_msg): raw bytes received from a peer.
/// 3. [`handle_final_committed`](Self::handle_final_committed): the core itself decided its round's
///    proposal.
/// 4. [`handle_timeout`](Self::handle_timeout): the round timer expired.
///
/// ## Round flow
///
/// On entering a round, every replica sends a [`NewView`] with its highest QC to the round's proposer.
/// The proposer waits for a quorum of NewViews, adopts the highest QC among them, and broadcasts a
/// [`Prepare`] with a proposal that extends it. From then on, each quorum of votes the proposer
/// collects becomes a QC that it broadcasts to move every replica to the next phase:
///
/// ```text
/// PrepareVote -> PreCommit(prepareQC) -> PreCommitVote -> Commit(precommitQC) -> CommitVote -> Decide(commitQC)
/// ```
///
/// A replica updates its highest QC on PreCommit, locks on Commit, and commits the proposal on Decide,
/// then enters the next round. If the round times out first, it enters the next round without
/// committing.
///
/// ## Out-of-order messages
///
/// Messages for a round ahead of the current one are [deferred](HandleOutcome::Deferred) into the
/// [`Backlog`] and replayed through the same checks once that round is entered. Messages for past
/// rounds are dropped.
pub struct Core<N: Network, A: App> {
    config: HotStuffConfiguration,
    round_state: RoundState,
    validator_set: ValidatorSet,
    high_qc: QuorumCertificate,
    locked_qc: QuorumCertificate,
    last_committed: Option<(CryptoHash, BlockHeight)>,
    proposals: HashMap<CryptoHash, Proposal>,
    pending_request: Option<Proposal>,
    aggregator: VoteAggregator,
    backlog: Backlog,
    pacemaker: Pacemaker,
    sender: SenderHandle<N>,
    app: A,
    event_mux: EventMux,
    started: bool,
}

impl<N: Network, A: App> Core<N, A> {
    /// Create a core that sits in round 0 with the genesis QC as both its highest and its locked QC.
    /// Nothing is sent until [`start`](Self::start) is called.
    pub fn new(
        config: HotStuffConfiguration,
        pacemaker_config: PacemakerConfiguration,
        network: N,
        mut app: A,
        event_mux: EventMux,
    ) -> Self {
        let validator_set = app.validator_set();
        let mut sender = SenderHandle::new(network);
        sender.update_validator_set(&validator_set);

        Self {
            round_state: RoundState::new(
                Round::init(),
                select_proposer(Round::init(), &validator_set),
            ),
            aggregator: VoteAggregator::new(validator_set.clone()),
            backlog: Backlog::new(config.backlog_capacity),
            pacemaker: Pacemaker::new(pacemaker_config, event_mux.clone()),
            validator_set,
            high_qc: QuorumCertificate::genesis_qc(),
            locked_qc: QuorumCertificate::genesis_qc(),
            last_committed: None,
            proposals: HashMap::new(),
            pending_request: None,
            sender,
            app,
            event_mux,
            config,
            started: false,
        }
    }

    /// Enter round 0: start its timer and send a NewView to its proposer. Does nothing if the core
    /// was already started.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.enter_round(self.round_state.round);
    }

    /// Cancel the round timer. No timeout is posted after this returns.
    pub fn stop(&mut self) {
        self.pacemaker.stop();
        self.started = false;
    }

    /// Keep `proposal` as the request to propose the next time this replica is the proposer, and
    /// propose it right away if this replica is the current round's proposer and has collected a
    /// quorum of NewViews.
    pub fn handle_request(&mut self, proposal: Proposal) -> HandleOutcome {
        if !proposal.is_correct() {
            return self.reject(None, HotStuffError::InvalidProposal);
        }
        self.pending_request = Some(proposal);

        match self.try_propose() {
            Ok(()) => HandleOutcome::Accepted,
            Err(error) => self.reject(None, error),
        }
    }

    /// Handle raw bytes received from the network.
    ///
    /// The bytes must decode into a [`Message`] whose signature verifies against its signer, and the
    /// signer must be in the current validator set. The message is then handled as in
    /// [`handle_checked_msg`](Self::handle_checked_msg).
    pub fn handle_msg(&mut self, payload: &[u8]) -> HandleOutcome {
        let (msg, signer) = match Message::from_payload(payload) {
            Ok(parsed) => parsed,
            Err(EnvelopeError::Malformed) => {
                return self.reject(None, HotStuffError::MalformedMessage)
            }
            Err(EnvelopeError::InvalidSignerKey | EnvelopeError::BadSignature) => {
                return self.reject(None, HotStuffError::InvalidSigner)
            }
        };

        if self.validator_set.get_by_address(&signer).is_none() {
            return self.reject(Some(&signer), HotStuffError::InvalidSigner);
        }

        self.handle_checked_msg(msg, signer)
    }

    /// Handle a message whose signature was verified to come from `src`, a member of the validator set.
    pub fn handle_checked_msg(&mut self, msg: Message, src: VerifyingKey) -> HandleOutcome {
        if self.config.log_events {
            if let Some(code) = msg.message_code() {
                debug::receive_message(code, msg.round, &src);
            }
        }

        match self.process_msg(&msg, &src) {
            Ok(()) => HandleOutcome::Accepted,
            Err(HotStuffError::FutureMessage { .. } | HotStuffError::PrematureVote { .. }) => {
                self.store_backlog(msg, src);
                HandleOutcome::Deferred
            }
            Err(error) => self.reject(Some(&src), error),
        }
    }

    /// Replay a message that was deferred into the backlog. Its signer is checked against the
    /// validator set again, since the set may have changed since the message was stored.
    pub fn handle_backlog(&mut self, msg: Message, src: VerifyingKey) -> HandleOutcome {
        if self.validator_set.get_by_address(&src).is_none() {
            return self.reject(Some(&src), HotStuffError::InvalidSigner);
        }
        self.handle_checked_msg(msg, src)
    }

    /// Handle the expiry of the timer started for `round`. If `round` is still the current round,
    /// the round is abandoned and the next one is entered with a doubled timeout. Timeouts for rounds
    /// the core already left are ignored.
    ///
    /// A round that already reached [`Decide`](Phase::Decide) is not abandoned: its proposal is
    /// committed before the next round is entered, as in
    /// [`handle_final_committed`](Self::handle_final_committed).
    pub fn handle_timeout(&mut self, round: Round) {
        let current = self.round_state.round;
        if round != current {
            if self.config.log_events {
                debug::stale_event("Timeout", round, current);
            }
            return;
        }

        if self.round_state.phase == Phase::Decide && self.commit_decided() {
            self.enter_round(current + 1);
            return;
        }

        if self.config.log_events {
            info::round_timeout(current, self.round_state.phase);
        }
        self.pacemaker.on_timeout();
        self.enter_round(current + 1);
    }

    /// Commit the proposal decided in `round`, then enter the next round.
    ///
    /// Ignored unless the core is still in `round` and in the [`Decide`](Phase::Decide) phase.
    pub fn handle_final_committed(&mut self, round: Round) {
        let current = self.round_state.round;
        if round != current || self.round_state.phase != Phase::Decide {
            if self.config.log_events {
                debug::stale_event("FinalCommitted", round, current);
            }
            return;
        }

        if self.commit_decided() {
            self.enter_round(current + 1);
        }
    }

    /// Hand the current round's proposal and its commitQC to the app. Returns false if the round has
    /// no decided proposal.
    fn commit_decided(&mut self) -> bool {
        let (Some(proposal), Some(commit_qc)) = (
            self.round_state.proposal.clone(),
            self.round_state.commit_qc.clone(),
        ) else {
            return false;
        };

        self.app.commit_proposal(&proposal, &commit_qc);
        self.last_committed = Some((proposal.hash, proposal.height));
        if self.config.log_events {
            info::commit_proposal(self.round_state.round, &proposal.hash, proposal.height);
        }

        if self
            .pending_request
            .as_ref()
            .is_some_and(|request| request.height <= proposal.height)
        {
            self.pending_request = None;
        }

        self.pacemaker.on_decide();
        true
    }

    pub fn current_round(&self) -> Round {
        self.round_state.round
    }

    pub fn current_phase(&self) -> Phase {
        self.round_state.phase
    }

    /// The proposal this replica voted for (or, as proposer, proposed) in the current round.
    pub fn current_proposal(&self) -> Option<&Proposal> {
        self.round_state.proposal.as_ref()
    }

    pub fn current_proposer(&self) -> Option<&VerifyingKey> {
        self.round_state.proposer.as_ref()
    }

    pub fn high_qc(&self) -> &QuorumCertificate {
        &self.high_qc
    }

    pub fn locked_qc(&self) -> &QuorumCertificate {
        &self.locked_qc
    }

    /// Hash of the most recently committed proposal.
    pub fn last_committed(&self) -> Option<CryptoHash> {
        self.last_committed.map(|(hash, _)| hash)
    }

    pub fn last_committed_height(&self) -> Option<BlockHeight> {
        self.last_committed.map(|(_, height)| height)
    }

    /// The Prepare-phase QC for the current proposal, once the replica has seen it.
    pub fn current_prepare_qc(&self) -> Option<&QuorumCertificate> {
        self.round_state.prepare_qc.as_ref()
    }

    pub fn pending_request(&self) -> Option<&Proposal> {
        self.pending_request.as_ref()
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    /// Number of proposals kept for re-proposal and the safety rule.
    pub fn known_proposals(&self) -> usize {
        self.proposals.len()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Number of distinct validators whose votes for `(round, phase)` were aggregated.
    pub fn vote_count(&self, round: Round, phase: Phase) -> usize {
        self.aggregator.vote_count(round, phase)
    }

    /// Number of rounds in a row that ended in a timeout.
    pub fn consecutive_timeouts(&self) -> u32 {
        self.pacemaker.consecutive_timeouts()
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    fn process_msg(&mut self, msg: &Message, src: &VerifyingKey) -> Result<(), HotStuffError> {
        let code = msg
            .message_code()
            .ok_or(HotStuffError::InvalidMessage { code: msg.code })?;
        let round = msg.round;

        match code {
            MessageCode::NewView => self.on_receive_new_view(round, decode(msg, code)?, src),
            MessageCode::Prepare => self.on_receive_prepare(round, decode(msg, code)?, src),
            MessageCode::PreCommit => self.on_receive_precommit(round, decode(msg, code)?, src),
            MessageCode::Commit => self.on_receive_commit(round, decode(msg, code)?, src),
            MessageCode::Decide => self.on_receive_decide(round, decode(msg, code)?, src),
            MessageCode::PrepareVote | MessageCode::PreCommitVote | MessageCode::CommitVote => {
                self.on_receive_vote(code, round, decode(msg, code)?, src)
            }
        }
    }

    fn on_receive_new_view(
        &mut self,
        round: Round,
        new_view: NewView,
        src: &VerifyingKey,
    ) -> Result<(), HotStuffError> {
        self.check_round(round, false)?;
        self.check_to_proposer()?;
        self.verify_qc(&new_view.high_qc, Phase::Prepare)?;

        let (position, _) = self
            .validator_set
            .get_by_address(src)
            .ok_or(HotStuffError::InvalidSigner)?;
        let quorum_reached = self
            .round_state
            .new_views
            .collect(round, position, new_view.high_qc, &self.validator_set)
            .map_err(|source| HotStuffError::AggregationFailure {
                phase: Phase::NewView,
                source,
            })?;

        if quorum_reached {
            let highest_qc = self.round_state.new_views.highest_qc().clone();
            self.update_high_qc(highest_qc);
            match self.try_propose() {
                Err(HotStuffError::NoValidRequest) if self.config.log_events => {
                    debug::no_valid_request(round, &self.high_qc.digest)
                }
                _ => (),
            }
        }
        Ok(())
    }

    fn on_receive_prepare(
        &mut self,
        round: Round,
        prepare: Prepare,
        src: &VerifyingKey,
    ) -> Result<(), HotStuffError> {
        self.check_round(round, false)?;
        self.check_from_proposer(src)?;
        if self.round_state.phase != Phase::NewView {
            return Err(HotStuffError::State {
                expected: Phase::NewView,
                actual: self.round_state.phase,
            });
        }
        self.verify_qc(&prepare.high_qc, Phase::Prepare)?;

        let Prepare { proposal, high_qc } = prepare;
        if !proposal.is_correct()
            || self
                .last_committed_height()
                .is_some_and(|committed| proposal.height <= committed)
        {
            return Err(HotStuffError::InvalidProposal);
        }
        if !extends_high_qc(&proposal, &high_qc) {
            return Err(HotStuffError::Extend);
        }
        if !safe_node(&proposal, &high_qc, &self.locked_qc, &self.proposals) {
            return Err(HotStuffError::SafeNode);
        }
        if self.app.validate_proposal(&proposal) == ValidateProposalResponse::Invalid {
            return Err(HotStuffError::InvalidProposal);
        }

        self.update_high_qc(high_qc);
        let digest = proposal.hash;
        self.proposals.insert(digest, proposal.clone());
        self.round_state.proposal = Some(proposal);
        self.round_state.phase = Phase::Prepare;
        self.vote(Phase::Prepare, digest);
        Ok(())
    }

    fn on_receive_precommit(
        &mut self,
        round: Round,
        precommit: PreCommit,
        src: &VerifyingKey,
    ) -> Result<(), HotStuffError> {
        self.check_round(round, false)?;
        self.check_from_proposer(src)?;

        let prepare_qc = precommit.prepare_qc;
        if prepare_qc.round != round || prepare_qc.phase != Phase::Prepare {
            return Err(HotStuffError::InconsistentPrepareQC);
        }
        let digest = self.expect_phase(Phase::Prepare)?;
        if prepare_qc.digest != digest {
            return Err(HotStuffError::InvalidDigest);
        }
        self.verify_qc(&prepare_qc, Phase::Prepare)?;

        self.round_state.prepare_qc = Some(prepare_qc.clone());
        self.update_high_qc(prepare_qc);
        self.round_state.phase = Phase::PreCommit;
        self.vote(Phase::PreCommit, digest);
        Ok(())
    }

    fn on_receive_commit(
        &mut self,
        round: Round,
        commit: Commit,
        src: &VerifyingKey,
    ) -> Result<(), HotStuffError> {
        self.check_round(round, false)?;
        self.check_from_proposer(src)?;

        let precommit_qc = commit.precommit_qc;
        let digest = self.expect_phase(Phase::PreCommit)?;
        self.verify_qc(&precommit_qc, Phase::PreCommit)?;
        if precommit_qc.round != round || precommit_qc.digest != digest {
            return Err(HotStuffError::InvalidDigest);
        }

        if self.config.log_events {
            debug::update_locked_qc(precommit_qc.round, &precommit_qc.digest);
        }
        self.locked_qc = precommit_qc;
        self.round_state.phase = Phase::Commit;
        self.vote(Phase::Commit, digest);
        Ok(())
    }

    fn on_receive_decide(
        &mut self,
        round: Round,
        decide: Decide,
        src: &VerifyingKey,
    ) -> Result<(), HotStuffError> {
        self.check_round(round, false)?;
        self.check_from_proposer(src)?;

        let commit_qc = decide.commit_qc;
        let digest = self.expect_phase(Phase::Commit)?;
        self.verify_qc(&commit_qc, Phase::Commit)?;
        if commit_qc.round != round
            || commit_qc.digest != digest
            || commit_qc.digest != self.locked_qc.digest
        {
            return Err(HotStuffError::InvalidDigest);
        }

        self.round_state.commit_qc = Some(commit_qc);
        self.round_state.phase = Phase::Decide;
        self.event_mux
            .post(Event::FinalCommitted(FinalCommittedEvent {
                timestamp: SystemTime::now(),
                round,
            }));
        Ok(())
    }

    fn on_receive_vote(
        &mut self,
        code: MessageCode,
        round: Round,
        vote: Vote,
        src: &VerifyingKey,
    ) -> Result<(), HotStuffError> {
        let phase = code.vote_phase().ok_or(HotStuffError::InvalidMessage {
            code: code.as_u8(),
        })?;
        self.check_round(round, true)?;
        self.check_to_proposer()?;
        if vote.round != round || vote.phase != phase {
            return Err(HotStuffError::InconsistentVote);
        }

        // The proposer only knows what to count votes against once it has proposed.
        let Some(digest) = self.round_state.proposal.as_ref().map(|proposal| proposal.hash) else {
            return Err(HotStuffError::PrematureVote { round });
        };
        if vote.digest != digest {
            return Err(HotStuffError::InconsistentVote);
        }

        let outcome = self
            .aggregator
            .add_vote(round, phase, vote.digest, src, vote.signature)
            .map_err(|source| HotStuffError::AggregationFailure { phase, source })?;
        if let VoteOutcome::Certified(qc) = outcome {
            self.on_collect_qc(qc);
        }
        Ok(())
    }

    /// Broadcast the message that carries a freshly collected `qc` to the next phase.
    fn on_collect_qc(&mut self, qc: QuorumCertificate) {
        let round = self.round_state.round;
        if self.config.log_events {
            info::collect_qc(round, qc.phase, &qc.digest, qc.signatures.count());
        }

        let keypair = &self.config.keypair;
        let msg = match qc.phase {
            Phase::Prepare => Message::wrap(
                keypair,
                MessageCode::PreCommit,
                round,
                &PreCommit { prepare_qc: qc },
            ),
            Phase::PreCommit => Message::wrap(
                keypair,
                MessageCode::Commit,
                round,
                &Commit { precommit_qc: qc },
            ),
            Phase::Commit => Message::wrap(
                keypair,
                MessageCode::Decide,
                round,
                &Decide { commit_qc: qc },
            ),
            Phase::NewView | Phase::Decide => return,
        };
        self.sender.broadcast(&msg);
    }

    /// Propose if this replica is the current round's proposer, has collected a quorum of NewViews,
    /// and has not proposed yet.
    ///
    /// A proposal certified by the highest QC but never decided is proposed again. Otherwise the
    /// pending request is proposed, provided it extends the highest QC.
    fn try_propose(&mut self) -> Result<(), HotStuffError> {
        let me = self.config.keypair.public();
        if self.round_state.proposed
            || !self.round_state.new_views.quorum_reached()
            || self.round_state.proposer != Some(me)
        {
            return Ok(());
        }

        let proposal = self
            .select_proposal()
            .ok_or(HotStuffError::NoValidRequest)?;
        let round = self.round_state.round;
        if self.config.log_events {
            info::propose(round, &proposal.hash, proposal.height);
        }

        self.round_state.proposed = true;
        self.round_state.proposal = Some(proposal.clone());
        self.proposals.insert(proposal.hash, proposal.clone());

        let prepare = Prepare {
            proposal,
            high_qc: self.high_qc.clone(),
        };
        let msg = Message::wrap(&self.config.keypair, MessageCode::Prepare, round, &prepare);
        self.sender.broadcast(&msg);

        // Votes that raced ahead of the proposal can be counted now.
        self.replay_backlog(round);
        Ok(())
    }

    fn select_proposal(&self) -> Option<Proposal> {
        let high_qc = &self.high_qc;
        if !high_qc.is_genesis_qc() && self.last_committed() != Some(high_qc.digest) {
            if let Some(certified) = self.proposals.get(&high_qc.digest) {
                return Some(certified.clone());
            }
        }

        self.pending_request
            .as_ref()
            .filter(|request| request.parent == high_qc.digest)
            .cloned()
    }

    /// Send this replica's vote for `digest` in `phase` to the current round's proposer.
    fn vote(&mut self, phase: Phase, digest: CryptoHash) {
        let round = self.round_state.round;
        let (Some(code), Some(proposer)) = (MessageCode::vote_for(phase), self.round_state.proposer)
        else {
            return;
        };

        let vote = Vote::new(&self.config.keypair, round, phase, digest);
        let msg = Message::wrap(&self.config.keypair, code, round, &vote);
        self.sender.send(proposer, &msg);
        if self.config.log_events {
            debug::vote(round, phase, &digest);
        }
    }

    /// Enter `round`: pick up the validator set for it, restart the timer, send a NewView to its
    /// proposer, and replay the messages deferred for it. Rounds never decrease.
    fn enter_round(&mut self, round: Round) {
        if round < self.round_state.round {
            return;
        }
        self.pacemaker.stop();

        let validator_set = self.app.validator_set();
        if validator_set != self.validator_set {
            if self.config.log_events {
                info::update_validator_set(round, validator_set.len());
            }
            self.sender.update_validator_set(&validator_set);
            self.validator_set = validator_set;
        }
        self.aggregator.update_validator_set(&self.validator_set);
        self.aggregator.prune(round);
        self.prune_proposals();

        let proposer = select_proposer(round, &self.validator_set);
        self.round_state = RoundState::new(round, proposer);
        let timeout = self.pacemaker.start_round(round);
        if self.config.log_events {
            info::start_round(round, proposer.as_ref(), timeout);
        }

        if let Some(proposer) = proposer {
            let new_view = NewView {
                high_qc: self.high_qc.clone(),
            };
            let msg = Message::wrap(&self.config.keypair, MessageCode::NewView, round, &new_view);
            self.sender.send(proposer, &msg);
            if self.config.log_events {
                debug::new_view(round, self.high_qc.round, &self.high_qc.digest);
            }
        }

        self.replay_backlog(round);
    }

    /// Keep only the proposals on the branch from the highQC's proposal back to the locked one.
    /// Re-proposal and the safety rule never look at any other proposal.
    fn prune_proposals(&mut self) {
        let mut branch = HashSet::new();
        let mut cursor = self.high_qc.digest;
        while let Some(proposal) = self.proposals.get(&cursor) {
            if !branch.insert(cursor) || cursor == self.locked_qc.digest {
                break;
            }
            cursor = proposal.parent;
        }
        branch.insert(self.locked_qc.digest);
        self.proposals.retain(|digest, _| branch.contains(digest));
    }

    fn replay_backlog(&mut self, round: Round) {
        let entries = self.backlog.drain(round);
        if entries.is_empty() {
            return;
        }
        if self.config.log_events {
            debug::drain_backlog(round, entries.len());
        }
        for (msg, src) in entries {
            self.handle_backlog(msg, src);
        }
    }

    fn store_backlog(&mut self, msg: Message, src: VerifyingKey) {
        if self.config.log_events {
            debug::store_backlog(msg.round, &src, self.backlog.len() + 1);
        }
        for (evicted, sender) in self.backlog.store(msg, src) {
            warn::evict_backlog(evicted.round, &sender);
        }
    }

    fn update_high_qc(&mut self, qc: QuorumCertificate) {
        if qc.ranks_above(&self.high_qc) {
            if self.config.log_events {
                debug::update_high_qc(qc.round, &qc.digest);
            }
            self.high_qc = qc;
        }
    }

    fn check_round(&self, round: Round, is_vote: bool) -> Result<(), HotStuffError> {
        let current = self.round_state.round;
        if round > current {
            Err(HotStuffError::FutureMessage { round, current })
        } else if round < current && is_vote {
            Err(HotStuffError::OldVote { round, current })
        } else if round < current {
            Err(HotStuffError::OldMessage { round, current })
        } else {
            Ok(())
        }
    }

    fn check_from_proposer(&self, src: &VerifyingKey) -> Result<(), HotStuffError> {
        if self.round_state.proposer.as_ref() != Some(src) {
            return Err(HotStuffError::NotFromProposer);
        }
        Ok(())
    }

    fn check_to_proposer(&self) -> Result<(), HotStuffError> {
        let me = self.config.keypair.public();
        if !is_proposer(&me, self.round_state.round, &self.validator_set) {
            return Err(HotStuffError::NotToProposer);
        }
        Ok(())
    }

    /// Check that the core is in `expected` phase, returning the digest of the current proposal.
    fn expect_phase(&self, expected: Phase) -> Result<CryptoHash, HotStuffError> {
        match (&self.round_state.proposal, self.round_state.phase) {
            (Some(proposal), actual) if actual == expected => Ok(proposal.hash),
            (_, actual) => Err(HotStuffError::State { expected, actual }),
        }
    }

    fn verify_qc(&self, qc: &QuorumCertificate, expected: Phase) -> Result<(), HotStuffError> {
        if qc.phase != expected {
            return Err(HotStuffError::VerifyQC(QCError::UnexpectedPhase {
                expected,
                found: qc.phase,
            }));
        }
        qc.verify(&self.validator_set).map_err(|error| match error {
            QCError::InvalidParticipant { .. } => HotStuffError::InvalidQCParticipant,
            other => HotStuffError::VerifyQC(other),
        })
    }

    fn reject(&self, sender: Option<&VerifyingKey>, error: HotStuffError) -> HandleOutcome {
        match error {
            HotStuffError::OldMessage { .. } | HotStuffError::OldVote { .. } => (),
            _ => warn::reject_message(
                self.round_state.phase,
                self.round_state.round,
                sender,
                &error,
            ),
        }
        HandleOutcome::Rejected(error)
    }
}

fn decode<T: BorshDeserialize>(msg: &Message, code: MessageCode) -> Result<T, HotStuffError> {
    msg.decode()
        .map_err(|_| HotStuffError::DecodeFailure { code })
}

/// Everything the core tracks about the round it is in. Replaced wholesale on entering a new round.
struct RoundState {
    round: Round,
    phase: Phase,
    proposer: Option<VerifyingKey>,
    proposal: Option<Proposal>,
    prepare_qc: Option<QuorumCertificate>,
    commit_qc: Option<QuorumCertificate>,
    new_views: NewViewCollector,
    proposed: bool,
}

impl RoundState {
    fn new(round: Round, proposer: Option<VerifyingKey>) -> RoundState {
        Self {
            round,
            phase: Phase::NewView,
            proposer,
            proposal: None,
            prepare_qc: None,
            commit_qc: None,
            new_views: NewViewCollector::new(),
            proposed: false,
        }
    }
}

/// Immutable parameters that determine the behaviour of the [`Core`].
#[derive(Clone)]
pub struct HotStuffConfiguration {
    pub keypair: Keypair,
    pub backlog_capacity: usize,
    pub log_events: bool,
}

/// What became of an event handed to the [`Core`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The event was processed and may have changed the core's state.
    Accepted,

    /// The message is for a round the core has not reached yet, and was stored in the backlog.
    Deferred,

    /// The event was dropped without changing the core's state.
    Rejected(HotStuffError),
}

impl HandleOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, HandleOutcome::Accepted)
    }

    pub fn error(&self) -> Option<&HotStuffError> {
        match self {
            HandleOutcome::Rejected(error) => Some(error),
            _ => None,
        }
    }
}

/// The different ways an event handed to the [`Core`] can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotStuffError {
    #[error("failed to decode {code} message")]
    DecodeFailure { code: MessageCode },

    #[error("message is not a well-formed envelope")]
    MalformedMessage,

    #[error("message not signed by the sender")]
    InvalidSigner,

    #[error("invalid message code {code}")]
    InvalidMessage { code: u8 },

    #[error("future message for round {round}, current round is {current}")]
    FutureMessage { round: Round, current: Round },

    #[error("old message for round {round}, current round is {current}")]
    OldMessage { round: Round, current: Round },

    #[error("old vote for round {round}, current round is {current}")]
    OldVote { round: Round, current: Round },

    #[error("vote for round {round} arrived before the proposal")]
    PrematureVote { round: Round },

    #[error("message does not come from proposer")]
    NotFromProposer,

    #[error("message does not send to proposer")]
    NotToProposer,

    #[error("inconsistent vote")]
    InconsistentVote,

    #[error("inconsistent prepare qc")]
    InconsistentPrepareQC,

    #[error("invalid digest")]
    InvalidDigest,

    #[error("verify qc error: {0}")]
    VerifyQC(QCError),

    #[error("invalid qc participant")]
    InvalidQCParticipant,

    #[error("proposal extend relationship error")]
    Extend,

    #[error("safeNode checking failed")]
    SafeNode,

    #[error("no valid request")]
    NoValidRequest,

    #[error("invalid proposal")]
    InvalidProposal,

    #[error("failed to add {phase} vote: {source}")]
    AggregationFailure {
        phase: Phase,
        source: AggregationError,
    },

    #[error("error state: expected phase {expected}, current phase {actual}")]
    State { expected: Phase, actual: Phase },
}
