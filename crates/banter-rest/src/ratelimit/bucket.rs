//! A single rate-limit bucket
//!
//! Admission state lives behind a short-held mutex; suspended requests park on a
//! [`Notify`] or sleep until the reset instant. Nothing here is ever held across
//! an await point.

use super::RateLimitEvent;
use banter_core::{BucketId, RateLimitInfo};
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tokio::time::{self, Instant};

/// Admission granted to one contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    /// Window generation the slot was taken from
    pub(crate) epoch: u64,
    /// Speculative request sent before the limit is known
    pub(crate) probe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    /// The lent probe has not resolved yet
    Probe,
    /// Window full and no reset known; an in-flight response will tell
    Completion,
    Until(Instant),
}

#[derive(Debug, Default)]
struct BucketState {
    limit: Option<u32>,
    remaining: Option<u32>,
    /// Requests admitted since the last reset
    window: u32,
    reset_at: Option<Instant>,
    lent: bool,
    unlimited: bool,
    epoch: u64,
}

impl BucketState {
    fn try_admit(&mut self, now: Instant) -> Result<Ticket, Wait> {
        if self.reset_at.is_some_and(|reset| now >= reset) {
            self.window = 0;
            self.reset_at = None;
            self.remaining = self.limit;
            self.epoch += 1;
        }

        if self.unlimited {
            return Ok(self.ticket(false));
        }

        let Some(limit) = self.limit else {
            if let Some(reset) = self.reset_at {
                return Err(Wait::Until(reset));
            }
            if self.lent {
                return Err(Wait::Probe);
            }
            self.lent = true;
            return Ok(self.ticket(true));
        };

        if self.window < limit {
            self.window += 1;
            return Ok(self.ticket(false));
        }

        Err(self.reset_at.map_or(Wait::Completion, Wait::Until))
    }

    fn apply(&mut self, ticket: Ticket, info: &RateLimitInfo, now: Instant) {
        if ticket.probe {
            self.lent = false;
        }

        if info.is_empty() {
            if self.limit.is_none() {
                self.unlimited = true;
            } else if !ticket.probe && ticket.epoch == self.epoch && self.reset_at.is_none() {
                // Nothing will ever reset this window, so the slot has to come back
                self.window = self.window.saturating_sub(1);
            }
            return;
        }

        self.unlimited = false;
        if self.limit.is_none() {
            self.limit = info.limit;
        }

        // A 429 always applies; other responses from a window that already
        // reset would only drag stale counters into the new one.
        if ticket.epoch != self.epoch && info.retry_after.is_none() {
            return;
        }

        if let Some(remaining) = info.remaining {
            self.remaining = Some(self.remaining.map_or(remaining, |cur| cur.min(remaining)));
            if let Some(limit) = self.limit {
                self.window = self.window.max(limit.saturating_sub(remaining));
            }
        }

        if let Some(reset_after) = info.reset_after {
            let reset_at = now + reset_after;
            if self.reset_at.map_or(true, |current| reset_at > current) {
                self.reset_at = Some(reset_at);
            }
        }
    }

    fn release(&mut self, ticket: Ticket, transmitted: bool) {
        if ticket.probe {
            self.lent = false;
            return;
        }

        if self.unlimited || ticket.epoch != self.epoch {
            return;
        }

        // A transmitted request counts against the server quota, unless no
        // reset is scheduled that would ever free its slot.
        if !transmitted || self.reset_at.is_none() {
            self.window = self.window.saturating_sub(1);
        }
    }

    fn ticket(&self, probe: bool) -> Ticket {
        Ticket {
            epoch: self.epoch,
            probe,
        }
    }
}

/// Point-in-time view of a bucket, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSnapshot {
    pub id: BucketId,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub window: u32,
    pub reset_at: Option<Instant>,
    pub lent: bool,
    pub unlimited: bool,
}

/// One rate-limit scope
pub struct Bucket {
    id: BucketId,
    state: Mutex<BucketState>,
    notify: Notify,
}

impl Bucket {
    pub(crate) fn new(id: BucketId) -> Self {
        Self {
            id,
            state: Mutex::new(BucketState::default()),
            notify: Notify::new(),
        }
    }

    pub fn id(&self) -> &BucketId {
        &self.id
    }

    /// Suspend until the bucket admits one more request
    pub(crate) async fn admit(&self, events: &broadcast::Sender<RateLimitEvent>) -> Ticket {
        loop {
            // Register for wakeups before inspecting state so a completion
            // between the check and the await is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let attempt = self.state.lock().try_admit(Instant::now());
            let wait = match attempt {
                Ok(ticket) => return ticket,
                Err(wait) => wait,
            };

            match wait {
                Wait::Probe | Wait::Completion => {
                    tracing::trace!(bucket = %self.id, ?wait, "Waiting for an in-flight request");
                    notified.await;
                }
                Wait::Until(reset_at) => {
                    tracing::debug!(
                        bucket = %self.id,
                        wait_ms = reset_at.saturating_duration_since(Instant::now()).as_millis(),
                        "Bucket exhausted, waiting for reset"
                    );
                    let _ = events.send(RateLimitEvent::BucketExhausted {
                        bucket: self.id.clone(),
                        reset_at,
                    });

                    tokio::select! {
                        () = time::sleep_until(reset_at) => {}
                        () = &mut notified => {}
                    }
                }
            }
        }
    }

    pub(crate) fn complete(&self, ticket: Ticket, info: &RateLimitInfo) {
        self.state.lock().apply(ticket, info, Instant::now());
        self.notify.notify_waiters();
    }

    pub(crate) fn cancel(&self, ticket: Ticket, transmitted: bool) {
        self.state.lock().release(ticket, transmitted);
        self.notify.notify_waiters();
    }

    pub fn snapshot(&self) -> BucketSnapshot {
        let state = self.state.lock();
        BucketSnapshot {
            id: self.id.clone(),
            limit: state.limit,
            remaining: state.remaining,
            window: state.window,
            reset_at: state.reset_at,
            lent: state.lent,
            unlimited: state.unlimited,
        }
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket").field("id", &self.id).finish()
    }
}
