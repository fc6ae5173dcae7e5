//! Outgoing frame budgets
//!
//! The gateway closes connections that send too much (close code 4008) and
//! rejects Identify frames that come too quickly. Both budgets are fixed
//! windows opened by the first frame counted in them.

use std::time::Duration;
use tokio::time::Instant;

/// At most `limit` frames per `period`
#[derive(Debug, Clone)]
pub struct SendWindow {
    limit: u32,
    period: Duration,
    started: Option<Instant>,
    used: u32,
}

impl SendWindow {
    pub fn new(limit: u32, period: Duration) -> Self {
        Self {
            limit: limit.max(1),
            period,
            started: None,
            used: 0,
        }
    }

    /// When the next frame may go out; `None` if it may go now
    pub fn blocked_until(&mut self, now: Instant) -> Option<Instant> {
        self.roll(now);
        match self.started {
            Some(started) if self.used >= self.limit => Some(started + self.period),
            _ => None,
        }
    }

    /// Count a frame sent at `now`
    pub fn record(&mut self, now: Instant) {
        self.roll(now);
        if self.started.is_none() {
            self.started = Some(now);
        }
        self.used = self.used.saturating_add(1);
    }

    /// Frames counted in the current window
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Start over, e.g. on a new connection
    pub fn reset(&mut self) {
        self.started = None;
        self.used = 0;
    }

    fn roll(&mut self, now: Instant) {
        if self
            .started
            .is_some_and(|started| now >= started + self.period)
        {
            self.reset();
        }
    }
}
