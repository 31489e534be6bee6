//! Fixed-delay poll scheduling.
//!
//! The next poll is due one interval after the previous one *finished*, so a
//! slow source pushes every later poll back. At most one poll is in flight.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PollSchedule {
    interval: Duration,
    next_due: Option<Instant>,
    in_flight: bool,
}

impl PollSchedule {
    /// Schedule whose first poll is due immediately.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: Some(now),
            in_flight: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// When the next poll may start; `None` while one is running or once the
    /// interval has run past what the clock can represent.
    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        !self.in_flight && self.next_due.is_some_and(|due| now >= due)
    }

    /// Record that a poll was sent.
    pub fn start(&mut self) {
        self.in_flight = true;
        self.next_due = None;
    }

    /// Record that the running poll finished, successfully or not.
    ///
    /// An interval too large for the clock leaves the schedule idle until a
    /// forced poll.
    pub fn complete(&mut self, now: Instant) {
        self.in_flight = false;
        self.next_due = now.checked_add(self.interval);
    }

    /// Pull the next poll forward to `now` unless one is already running.
    pub fn force(&mut self, now: Instant) {
        if !self.in_flight {
            self.next_due = Some(now);
        }
    }

    /// Time until the next poll is due, zero if overdue, `None` while in flight.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}
