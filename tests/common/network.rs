use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use hotstuff_basic::{
    event_bus::EventMux,
    events::{Event, MessageEvent},
    hotstuff::messages::Message,
    networking::Network,
    types::{crypto_primitives::VerifyingKey, validator_set::ValidatorSet},
};

/// A mock network stub which delivers payloads by posting them onto the receiving replica's event mux.
#[derive(Clone)]
pub(crate) struct NetworkStub {
    all_peers: HashMap<VerifyingKey, EventMux>,
}

impl Network for NetworkStub {
    fn update_validator_set(&mut self, _: &ValidatorSet) {}

    fn broadcast(&mut self, payload: Vec<u8>) {
        for event_mux in self.all_peers.values() {
            event_mux.post(Event::Message(MessageEvent {
                payload: payload.clone(),
            }));
        }
    }

    fn send(&mut self, peer: VerifyingKey, payload: Vec<u8>) {
        if let Some(event_mux) = self.all_peers.get(&peer) {
            event_mux.post(Event::Message(MessageEvent { payload }));
        }
    }
}

/// Create one event mux per peer, and a network stub per peer that connects it to all of them.
pub(crate) fn mock_network(
    peers: impl Iterator<Item = VerifyingKey>,
) -> Vec<(NetworkStub, EventMux)> {
    let all_peers: HashMap<VerifyingKey, EventMux> =
        peers.map(|peer| (peer, EventMux::new())).collect();

    let mut stubs: Vec<(VerifyingKey, (NetworkStub, EventMux))> = all_peers
        .iter()
        .map(|(peer, event_mux)| {
            let stub = NetworkStub {
                all_peers: all_peers.clone(),
            };
            (*peer, (stub, event_mux.clone()))
        })
        .collect();
    stubs.sort_by_key(|(peer, _)| peer.to_bytes());
    stubs.into_iter().map(|(_, stub)| stub).collect()
}

/// Something a [`RecordingNetwork`] was asked to deliver.
#[derive(Clone, Debug)]
pub(crate) enum Outgoing {
    Broadcast(Message),
    Send(VerifyingKey, Message),
}

impl Outgoing {
    pub(crate) fn message(&self) -> &Message {
        match self {
            Outgoing::Broadcast(message) | Outgoing::Send(_, message) => message,
        }
    }
}

/// A network that delivers nothing, and records everything it is asked to send so that tests can
/// inspect it and feed it back.
#[derive(Clone, Default)]
pub(crate) struct RecordingNetwork {
    outbox: Arc<Mutex<Vec<Outgoing>>>,
}

impl RecordingNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub(crate) fn take(&self) -> Vec<Outgoing> {
        std::mem::take(&mut *self.outbox.lock().unwrap())
    }
}

impl Network for RecordingNetwork {
    fn update_validator_set(&mut self, _: &ValidatorSet) {}

    fn broadcast(&mut self, payload: Vec<u8>) {
        let (message, _) = Message::from_payload(&payload).unwrap();
        self.outbox.lock().unwrap().push(Outgoing::Broadcast(message));
    }

    fn send(&mut self, peer: VerifyingKey, payload: Vec<u8>) {
        let (message, _) = Message::from_payload(&payload).unwrap();
        self.outbox.lock().unwrap().push(Outgoing::Send(peer, message));
    }
}
