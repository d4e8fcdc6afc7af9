use std::time::Duration;

use ed25519_dalek::SigningKey;
use hotstuff_basic::{
    event_bus::EventMux,
    replica::{Configuration, Replica, ReplicaSpec},
    types::{proposal::Proposal, validator_set::ValidatorSet},
};

use super::{counter_app::CounterApp, network::NetworkStub};

/// Things the Nodes will have in common:
/// - Validator Set.
/// - Configuration.
///
/// Things that they will differ in:
/// - App instance.
/// - Network instance.
/// - Keypair.
pub(crate) struct Node {
    app: CounterApp,
    replica: Replica,
}

impl Node {
    pub(crate) fn new(
        keypair: SigningKey,
        network: NetworkStub,
        event_mux: EventMux,
        validator_set: ValidatorSet,
    ) -> Node {
        let app = CounterApp::new(validator_set);

        let configuration = Configuration::builder()
            .me(keypair)
            .request_timeout(Duration::from_millis(500))
            .max_round_timeout(Duration::from_secs(2))
            .poll_interval(Duration::from_millis(5))
            .log_events(true)
            .build();

        let replica = ReplicaSpec::builder()
            .app(app.clone())
            .network(network)
            .event_mux(event_mux)
            .configuration(configuration)
            .build()
            .start();

        Node { app, replica }
    }

    pub(crate) fn submit_request(&self, proposal: Proposal) {
        self.replica.submit_request(proposal)
    }

    pub(crate) fn committed(&self) -> Vec<Proposal> {
        self.app.committed()
    }

    pub(crate) fn last_committed(&self) -> Option<Proposal> {
        self.app.committed().last().cloned()
    }
}
