/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and run a replica.
//!
//! A replica is one validator's instance of the consensus core, running in its own algorithm thread.
//! Each replica is uniquely identified by an [Ed25519 public key](ed25519_dalek::VerifyingKey).
//!
//! The key components of this module are:
//! - The builder-pattern interface to construct a [specification of the replica](ReplicaSpec) with:
//!   1. `ReplicaSpec::builder` to construct a `ReplicaSpecBuilder`,
//!   2. The setters of the `ReplicaSpecBuilder`, and
//!   3. The `ReplicaSpecBuilder::build` method to construct a [ReplicaSpec],
//! - The function to [start](ReplicaSpec::start) a [Replica] given its specification,
//! - [The type](Replica) which keeps the replica alive.
//!
//! ## Starting a replica
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .me(keypair)
//!     .request_timeout(Duration::from_millis(500))
//!     .max_round_timeout(Duration::from_secs(30))
//!     .log_events(true)
//!     .build();
//!
//! let replica =
//!     ReplicaSpec::builder()
//!     .app(app)
//!     .network(network)
//!     .event_mux(event_mux)
//!     .configuration(configuration)
//!     .build()
//!     .start();
//! ```
//!
//! The transport passed to `.network(...)` is expected to post every payload it receives from a peer
//! onto the same `event_mux` as a [`MessageEvent`](crate::events::MessageEvent). Proposals to propose
//! are submitted with [`Replica::submit_request`].

use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use ed25519_dalek::SigningKey;
use typed_builder::TypedBuilder;

use crate::algorithm::Algorithm;
use crate::app::App;
use crate::event_bus::EventMux;
use crate::events::{Event, EventKind, RequestEvent};
use crate::hotstuff::implementation::{Core, HotStuffConfiguration};
use crate::networking::network::Network;
use crate::pacemaker::implementation::PacemakerConfiguration;
use crate::types::crypto_primitives::{Keypair, VerifyingKey};
use crate::types::proposal::Proposal;

/// Stores the user-defined parameters required to start the replica, that is:
/// 1. The replica's [keypair](ed25519_dalek::SigningKey).
/// 2. The request timeout, which is the deadline of a round that follows a decided round.
/// 3. The maximum round timeout, which caps the exponentially increasing deadline of rounds that follow
///    timed-out rounds.
/// 4. The backlog capacity, which defines the maximum number of future-round messages the replica
///    holds on to. If this capacity is about to be exceeded, messages for the lowest rounds are
///    removed to make space for new messages.
/// 5. The poll interval, which bounds how long the algorithm thread blocks waiting for a message before
///    checking for timeouts and shutdown again.
/// 6. The "Log Events" flag, if set to "true" then logs should be printed.
///
/// ## Round timeouts
///
/// Durations stored in [Configuration::request_timeout] and [Configuration::max_round_timeout] must be
/// "well below" [u64::MAX] seconds, since the timeout of a round can be up to 64 times the request
/// timeout before it is capped.
///
/// ## Log Events
///
/// The replica logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.me(...)`
    - `.request_timeout(...)`
    - `.max_round_timeout(...)`
    - `.log_events(...)`

    Optional:
    - `.backlog_capacity(...)`
    - `.poll_interval(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the replica's keypair, used to sign messages. Required."))]
    pub me: SigningKey,
    #[builder(setter(doc = "Set the deadline of a round that follows a decided round. Required."))]
    pub request_timeout: Duration,
    #[builder(setter(doc = "Set the maximum deadline of any round. Required."))]
    pub max_round_timeout: Duration,
    #[builder(
        default = 1024,
        setter(doc = "Set the maximum number of future-round messages held in the backlog. Optional, defaults to 1024.")
    )]
    pub backlog_capacity: usize,
    #[builder(
        default = Duration::from_millis(10),
        setter(doc = "Set how long the algorithm thread waits for a message before checking for timeouts and shutdown. Optional, defaults to 10ms.")
    )]
    pub poll_interval: Duration,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

impl From<Configuration> for (HotStuffConfiguration, PacemakerConfiguration) {
    fn from(configuration: Configuration) -> Self {
        let hotstuff_config = HotStuffConfiguration {
            keypair: Keypair::new(configuration.me),
            backlog_capacity: configuration.backlog_capacity,
            log_events: configuration.log_events,
        };
        let pacemaker_config = PacemakerConfiguration {
            base_timeout: configuration.request_timeout,
            max_timeout: configuration.max_round_timeout,
        };
        (hotstuff_config, pacemaker_config)
    }
}

/// Stores all necessary parameters and trait implementations required to run the [Replica].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ReplicaSpec]. On the builder call the following methods to construct a valid [ReplicaSpec].

    Required:
    - `.app(...)`
    - `.network(...)`
    - `.event_mux(...)`
    - `.configuration(...)`
"))]
pub struct ReplicaSpec<A: App + 'static, N: Network + 'static> {
    #[builder(setter(doc = "Set the application whose proposals are replicated. The argument must implement the [App](crate::app::App) trait. Required."))]
    app: A,
    #[builder(setter(doc = "Set the implementation of peer-to-peer networking. The argument must implement the [Network](crate::networking::Network) trait. Required."))]
    network: N,
    #[builder(setter(doc = "Set the [EventMux] that the transport posts received messages onto. Required."))]
    event_mux: EventMux,
    #[builder(setter(doc = "Set the [configuration](Configuration), which contains the necessary parameters to run a replica. Required."))]
    configuration: Configuration,
}

impl<A: App + 'static, N: Network + 'static> ReplicaSpec<A, N> {
    /// Starts the algorithm thread and returns a [Replica] that keeps it alive.
    ///
    /// The subscriptions on the event mux are taken before this returns, so every event posted after
    /// `start` is seen by the replica.
    pub fn start(self) -> Replica {
        let poll_interval = self.configuration.poll_interval;
        let (hotstuff_config, pacemaker_config) = self.configuration.into();
        let public_key = hotstuff_config.keypair.public();

        let events = self
            .event_mux
            .subscribe(&[EventKind::Request, EventKind::Message]);
        let final_committed = self.event_mux.subscribe(&[EventKind::FinalCommitted]);
        let timeouts = self.event_mux.subscribe(&[EventKind::Timeout]);

        let core = Core::new(
            hotstuff_config,
            pacemaker_config,
            self.network,
            self.app,
            self.event_mux.clone(),
        );

        let (algorithm_shutdown, algorithm_shutdown_receiver) = mpsc::channel();
        let algorithm = Algorithm::new(
            core,
            events,
            final_committed,
            timeouts,
            poll_interval,
            algorithm_shutdown_receiver,
        )
        .start();

        Replica {
            public_key,
            event_mux: self.event_mux,
            algorithm: Some(algorithm),
            algorithm_shutdown,
        }
    }
}

/// A handle to the algorithm thread of a replica. When this value is dropped, the thread is gracefully
/// shut down.
pub struct Replica {
    public_key: VerifyingKey,
    event_mux: EventMux,
    algorithm: Option<JoinHandle<()>>,
    algorithm_shutdown: Sender<()>,
}

impl Replica {
    /// Hand `proposal` to the replica to propose the next time it is a round's proposer.
    pub fn submit_request(&self, proposal: Proposal) {
        self.event_mux
            .post(Event::Request(RequestEvent { proposal }))
    }

    pub fn event_mux(&self) -> &EventMux {
        &self.event_mux
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.public_key
    }
}

impl Drop for Replica {
    fn drop(&mut self) {
        let _ = self.algorithm_shutdown.send(());
        if let Some(algorithm) = self.algorithm.take() {
            let _ = algorithm.join();
        }
    }
}
