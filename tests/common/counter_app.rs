use std::sync::{Arc, Mutex};

use hotstuff_basic::{
    app::{App, ValidateProposalResponse},
    hotstuff::types::QuorumCertificate,
    types::{proposal::Proposal, validator_set::ValidatorSet},
};

/// An app that accepts every proposal with non-empty data and counts the proposals it commits.
#[derive(Clone)]
pub(crate) struct CounterApp {
    validator_set: ValidatorSet,
    committed: Arc<Mutex<Vec<Proposal>>>,
}

impl CounterApp {
    pub(crate) fn new(validator_set: ValidatorSet) -> Self {
        Self {
            validator_set,
            committed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The proposals committed so far, oldest first.
    pub(crate) fn committed(&self) -> Vec<Proposal> {
        self.committed.lock().unwrap().clone()
    }

    pub(crate) fn count(&self) -> usize {
        self.committed.lock().unwrap().len()
    }
}

impl App for CounterApp {
    fn validator_set(&mut self) -> ValidatorSet {
        self.validator_set.clone()
    }

    fn validate_proposal(&mut self, proposal: &Proposal) -> ValidateProposalResponse {
        if proposal.data.is_empty() {
            ValidateProposalResponse::Invalid
        } else {
            ValidateProposalResponse::Valid
        }
    }

    fn commit_proposal(&mut self, proposal: &Proposal, _commit_qc: &QuorumCertificate) {
        self.committed.lock().unwrap().push(proposal.clone());
    }
}
