/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Timer-driven implementation of round timeouts.
//!
//! Main type: [`Pacemaker`].

use std::{
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::{Duration, SystemTime},
};

use crate::{
    event_bus::EventMux,
    events::{Event, TimeoutEvent},
    types::data_types::Round,
};

/// Maximum multiplier for exponential backoff (2^6 = 64x base timeout).
const MAX_BACKOFF_EXPONENT: u32 = 6;

#[derive(Clone, Copy, Debug)]
pub struct PacemakerConfiguration {
    /// Deadline of a round that follows a decided round.
    pub base_timeout: Duration,
    /// Upper bound on the deadline of any round.
    pub max_timeout: Duration,
}

/// Decides how long each round may last and keeps the [`RoundTimer`] running for the current round.
///
/// # Usage
///
/// The [`Core`](crate::hotstuff::implementation::Core) calls [`start_round`](Self::start_round) every
/// time it enters a round, and reports how the previous round ended first: through
/// [`on_timeout`](Self::on_timeout) if it timed out, or [`on_decide`](Self::on_decide) if its proposal
/// was committed.
pub struct Pacemaker {
    config: PacemakerConfiguration,
    consecutive_timeouts: u32,
    timer: RoundTimer,
}

impl Pacemaker {
    pub fn new(config: PacemakerConfiguration, event_mux: EventMux) -> Pacemaker {
        Self {
            config,
            consecutive_timeouts: 0,
            timer: RoundTimer::new(event_mux),
        }
    }

    /// The deadline of the next round to start.
    pub fn round_timeout(&self) -> Duration {
        let exponent = self.consecutive_timeouts.min(MAX_BACKOFF_EXPONENT);
        self.config
            .base_timeout
            .saturating_mul(2u32.pow(exponent))
            .min(self.config.max_timeout)
    }

    /// Restart the timer for `round`, returning the deadline it was given.
    pub fn start_round(&mut self, round: Round) -> Duration {
        let timeout = self.round_timeout();
        self.timer.start(round, timeout);
        timeout
    }

    /// Cancel the running timer, if any.
    pub fn stop(&mut self) {
        self.timer.stop()
    }

    pub fn on_timeout(&mut self) {
        self.consecutive_timeouts = self.consecutive_timeouts.saturating_add(1);
    }

    pub fn on_decide(&mut self) {
        self.consecutive_timeouts = 0;
    }

    pub fn consecutive_timeouts(&self) -> u32 {
        self.consecutive_timeouts
    }

    /// The round the timer is currently running for.
    pub fn active_round(&self) -> Option<Round> {
        self.timer.active_round()
    }
}

/// One-shot timer that posts a [`TimeoutEvent`] for a round onto the [`EventMux`] when it expires.
///
/// At most one timer runs at a time: starting a new one cancels the previous one. A timer that is
/// cancelled before it expires posts nothing. One that expires at the same moment it is cancelled may
/// still post, so receivers must ignore timeouts for rounds they already left.
pub struct RoundTimer {
    event_mux: EventMux,
    active: Option<ActiveTimer>,
}

struct ActiveTimer {
    round: Round,
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

impl RoundTimer {
    pub fn new(event_mux: EventMux) -> RoundTimer {
        Self {
            event_mux,
            active: None,
        }
    }

    /// Start a timer for `round` that expires after `duration`, cancelling the running one.
    pub fn start(&mut self, round: Round, duration: Duration) {
        self.stop();

        let (cancel, cancelled) = mpsc::channel();
        let event_mux = self.event_mux.clone();
        let handle = thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(duration) {
                event_mux.post(Event::Timeout(TimeoutEvent {
                    timestamp: SystemTime::now(),
                    round,
                }));
            }
        });

        self.active = Some(ActiveTimer {
            round,
            cancel,
            handle,
        });
    }

    /// Cancel the running timer and wait for its thread to exit. Does nothing if no timer is running.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.cancel.send(());
            let _ = active.handle.join();
        }
    }

    pub fn active_round(&self) -> Option<Round> {
        self.active.as_ref().map(|active| active.round)
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.stop()
    }
}
