//! Tests for round deadlines, the round timer, and the event mux the timer posts onto.

use std::time::Duration;

use hotstuff_basic::{
    event_bus::EventMux,
    events::{Event, EventKind, RequestEvent},
    pacemaker::{Pacemaker, PacemakerConfiguration, RoundTimer},
    types::data_types::{CryptoHash, Round},
};

mod common;

use crate::common::fixtures::proposal;

#[test]
fn round_timeout_backs_off_and_resets_test() {
    let mut pacemaker = Pacemaker::new(
        PacemakerConfiguration {
            base_timeout: Duration::from_millis(100),
            max_timeout: Duration::from_secs(3),
        },
        EventMux::new(),
    );
    assert_eq!(pacemaker.round_timeout(), Duration::from_millis(100));

    let mut timeouts = Vec::new();
    for _ in 0..7 {
        pacemaker.on_timeout();
        timeouts.push(pacemaker.round_timeout().as_millis());
    }
    assert_eq!(timeouts, vec![200, 400, 800, 1600, 3000, 3000, 3000]);
    assert_eq!(pacemaker.consecutive_timeouts(), 7);

    pacemaker.on_decide();
    assert_eq!(pacemaker.consecutive_timeouts(), 0);
    assert_eq!(pacemaker.round_timeout(), Duration::from_millis(100));
}

#[test]
fn backoff_exponent_is_capped_test() {
    let mut pacemaker = Pacemaker::new(
        PacemakerConfiguration {
            base_timeout: Duration::from_millis(10),
            max_timeout: Duration::from_secs(3600),
        },
        EventMux::new(),
    );
    for _ in 0..20 {
        pacemaker.on_timeout();
    }
    assert_eq!(pacemaker.round_timeout(), Duration::from_millis(640));
}

#[test]
fn timer_posts_timeout_for_its_round_test() {
    let event_mux = EventMux::new();
    let timeouts = event_mux.subscribe(&[EventKind::Timeout]);
    let mut timer = RoundTimer::new(event_mux.clone());

    timer.start(Round::new(4), Duration::from_millis(20));
    assert_eq!(timer.active_round(), Some(Round::new(4)));

    match timeouts.recv_timeout(Duration::from_secs(5)) {
        Ok(Event::Timeout(timeout)) => assert_eq!(timeout.round, Round::new(4)),
        other => panic!("expected a Timeout event, got {:?}", other),
    }
}

#[test]
fn stopped_timer_posts_nothing_test() {
    let event_mux = EventMux::new();
    let timeouts = event_mux.subscribe(&[EventKind::Timeout]);
    let mut timer = RoundTimer::new(event_mux.clone());

    timer.start(Round::new(1), Duration::from_millis(200));
    timer.stop();
    assert_eq!(timer.active_round(), None);

    // Restarting cancels the timer that was running.
    timer.start(Round::new(2), Duration::from_millis(200));
    timer.start(Round::new(3), Duration::from_millis(20));

    match timeouts.recv_timeout(Duration::from_secs(5)) {
        Ok(Event::Timeout(timeout)) => assert_eq!(timeout.round, Round::new(3)),
        other => panic!("expected a Timeout event, got {:?}", other),
    }
    assert!(timeouts.recv_timeout(Duration::from_millis(400)).is_err());
}

#[test]
fn event_mux_delivers_by_kind_test() {
    let event_mux = EventMux::new();
    let requests = event_mux.subscribe(&[EventKind::Request]);
    let mut everything = event_mux.subscribe(&[
        EventKind::Request,
        EventKind::Message,
        EventKind::FinalCommitted,
        EventKind::Timeout,
    ]);
    assert_eq!(event_mux.subscriber_count(), 2);

    let p = proposal(0, CryptoHash::zero(), 1);
    event_mux.post(Event::Request(RequestEvent { proposal: p.clone() }));
    event_mux.post(Event::Message(hotstuff_basic::events::MessageEvent {
        payload: vec![1],
    }));

    match requests.try_recv() {
        Ok(Event::Request(request)) => assert_eq!(request.proposal, p),
        other => panic!("expected a Request event, got {:?}", other),
    }
    assert!(requests.try_recv().is_err());
    assert_eq!(everything.try_recv().map(|event| event.kind()), Ok(EventKind::Request));
    assert_eq!(everything.try_recv().map(|event| event.kind()), Ok(EventKind::Message));

    // Unsubscribing twice is harmless, and dropping a subscription unsubscribes it.
    everything.unsubscribe();
    everything.unsubscribe();
    assert_eq!(event_mux.subscriber_count(), 1);
    drop(requests);
    assert_eq!(event_mux.subscriber_count(), 0);
    event_mux.post(Event::Message(hotstuff_basic::events::MessageEvent {
        payload: vec![2],
    }));
    assert!(everything.try_recv().is_err());
}
