//! Retransmission timer.
//!
//! Go-Back-N runs a **single** timer for the whole window rather than one
//! per outstanding datagram.  It always measures the age of the oldest
//! unacknowledged datagram: the sender starts it when the window goes from
//! empty to non-empty, restarts it whenever `base` advances, and stops it
//! when the window drains.
//!
//! The timer is polled, not event driven.  [`RetransmitTimer::timeout`]
//! reports an expiry exactly once and leaves the timer disarmed; the caller
//! decides whether to restart it.
//!
//! Deadlines use [`tokio::time::Instant`] so tests running on a paused
//! runtime clock see deterministic expiries.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct RetransmitTimer {
    duration: Duration,
    /// `Some` while armed.
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
        }
    }

    /// Arm the timer for one full duration from now, replacing any running
    /// deadline.
    pub fn start(&mut self) {
        self.deadline = Some(Instant::now() + self.duration);
    }

    /// Disarm the timer.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// When the armed timer will expire.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Report whether the armed deadline has passed.
    ///
    /// Returns `true` at most once per [`start`](Self::start): an expired
    /// timer disarms itself as it reports.
    pub fn timeout(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
