use std::time::Duration;

use borsh::BorshSerialize;
use ed25519_dalek::SigningKey;
use rand_core::OsRng;

use hotstuff_basic::{
    event_bus::{EventMux, Subscription},
    events::EventKind,
    hotstuff::{
        implementation::{Core, HandleOutcome, HotStuffConfiguration},
        messages::{Message, MessageCode, NewView, Vote},
        types::{Phase, QuorumCertificate, VoteAggregator, VoteOutcome},
    },
    pacemaker::PacemakerConfiguration,
    types::{
        crypto_primitives::{Keypair, VerifyingKey},
        data_types::{BlockHeight, CryptoHash, Data, Round},
        proposal::Proposal,
        validator_set::ValidatorSet,
    },
};

use super::{
    counter_app::CounterApp,
    network::{Outgoing, RecordingNetwork},
};

/// Generate `n` keypairs, ordered the way the validator set orders their public keys, so that the
/// keypair at index `i` belongs to the validator at position `i`.
pub(crate) fn keypairs(n: usize) -> Vec<Keypair> {
    let mut csprg = OsRng {};
    let mut keypairs: Vec<Keypair> = (0..n)
        .map(|_| Keypair::new(SigningKey::generate(&mut csprg)))
        .collect();
    keypairs.sort_by_key(|keypair| keypair.public().to_bytes());
    keypairs
}

pub(crate) fn validator_set(keypairs: &[Keypair]) -> ValidatorSet {
    keypairs.iter().map(|keypair| keypair.public()).collect()
}

pub(crate) fn proposal(height: u64, parent: CryptoHash, tag: u8) -> Proposal {
    Proposal::new(BlockHeight::new(height), parent, Data::new(vec![tag]))
}

/// Serialize `typed` into the wire bytes of a message signed by `keypair`.
pub(crate) fn signed<T: BorshSerialize>(
    keypair: &Keypair,
    code: MessageCode,
    round: Round,
    typed: &T,
) -> Vec<u8> {
    Message::wrap(keypair, code, round, typed).to_payload()
}

pub(crate) fn new_view(keypair: &Keypair, round: Round, high_qc: &QuorumCertificate) -> Vec<u8> {
    signed(
        keypair,
        MessageCode::NewView,
        round,
        &NewView {
            high_qc: high_qc.clone(),
        },
    )
}

pub(crate) fn vote(keypair: &Keypair, code: MessageCode, round: Round, digest: CryptoHash) -> Vec<u8> {
    let phase = code.vote_phase().unwrap();
    signed(keypair, code, round, &Vote::new(keypair, round, phase, digest))
}

/// Collect votes from `signers`, in order, until they form a QC.
pub(crate) fn certify(
    signers: &[&Keypair],
    validator_set: &ValidatorSet,
    round: Round,
    phase: Phase,
    digest: CryptoHash,
) -> QuorumCertificate {
    let mut aggregator = VoteAggregator::new(validator_set.clone());
    for signer in signers {
        let vote = Vote::new(signer, round, phase, digest);
        if let VoteOutcome::Certified(qc) = aggregator
            .add_vote(round, phase, digest, &signer.public(), vote.signature)
            .unwrap()
        {
            return qc;
        }
    }
    panic!("signers do not form a quorum")
}

/// A single core whose outgoing messages are recorded instead of delivered, so that a test can drive
/// it one message at a time.
pub(crate) struct Harness {
    pub(crate) core: Core<RecordingNetwork, CounterApp>,
    pub(crate) network: RecordingNetwork,
    pub(crate) app: CounterApp,
    pub(crate) keypairs: Vec<Keypair>,
    pub(crate) validator_set: ValidatorSet,
    pub(crate) event_mux: EventMux,
    pub(crate) final_committed: Subscription,
}

impl Harness {
    /// Start a core for the validator at position `me` in a set of `n` validators. Round timers are
    /// long enough to never fire during a test.
    pub(crate) fn new(n: usize, me: usize) -> Harness {
        Self::with_backlog_capacity(n, me, 1024)
    }

    pub(crate) fn with_backlog_capacity(n: usize, me: usize, backlog_capacity: usize) -> Harness {
        let keypairs = keypairs(n);
        let validator_set = validator_set(&keypairs);
        let network = RecordingNetwork::new();
        let app = CounterApp::new(validator_set.clone());
        let event_mux = EventMux::new();
        let final_committed = event_mux.subscribe(&[EventKind::FinalCommitted]);

        let mut core = Core::new(
            HotStuffConfiguration {
                keypair: keypairs[me].clone(),
                backlog_capacity,
                log_events: true,
            },
            PacemakerConfiguration {
                base_timeout: Duration::from_secs(3600),
                max_timeout: Duration::from_secs(3600),
            },
            network.clone(),
            app.clone(),
            event_mux.clone(),
        );
        core.start();

        Harness {
            core,
            network,
            app,
            keypairs,
            validator_set,
            event_mux,
            final_committed,
        }
    }

    pub(crate) fn public(&self, position: usize) -> VerifyingKey {
        self.keypairs[position].public()
    }

    pub(crate) fn deliver(&mut self, payload: &[u8]) -> HandleOutcome {
        self.core.handle_msg(payload)
    }

    /// Deliver a message this core sent back to itself, as a network that includes the sender in
    /// broadcasts would.
    pub(crate) fn loop_back(&mut self, outgoing: &Outgoing) -> HandleOutcome {
        self.core.handle_msg(&outgoing.message().to_payload())
    }

    pub(crate) fn outbox(&self) -> Vec<Outgoing> {
        self.network.take()
    }

    /// Take the recorded outgoing messages and return the only one with `code`.
    pub(crate) fn sent(&self, code: MessageCode) -> Outgoing {
        let mut matching: Vec<Outgoing> = self
            .network
            .take()
            .into_iter()
            .filter(|outgoing| outgoing.message().message_code() == Some(code))
            .collect();
        assert_eq!(matching.len(), 1, "expected exactly one {} message", code);
        matching.remove(0)
    }

    /// Build a QC for `digest` from the votes of the first validators that make up a quorum.
    pub(crate) fn certify(&self, round: Round, phase: Phase, digest: CryptoHash) -> QuorumCertificate {
        let signers: Vec<&Keypair> = self.keypairs.iter().collect();
        certify(&signers, &self.validator_set, round, phase, digest)
    }
}
