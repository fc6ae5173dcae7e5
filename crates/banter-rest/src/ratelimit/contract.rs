//! Rate-limit contracts
//!
//! A contract is one admitted slot in a bucket. It ends exactly once, through
//! [`Contract::complete`], [`Contract::cancel`] or [`Contract::cancel_unsent`];
//! dropping an active contract cancels it.

use super::bucket::{Bucket, Ticket};
use super::{RateLimitEvent, RateLimiter};
use crate::error::RateLimitError;
use banter_core::{BucketId, RateLimitInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Permission for one in-flight request
pub struct Contract {
    limiter: RateLimiter,
    bucket: Arc<Bucket>,
    endpoint_key: String,
    ticket: Ticket,
    active: AtomicBool,
    transmitted: AtomicBool,
}

impl Contract {
    pub(crate) fn new(
        limiter: RateLimiter,
        bucket: Arc<Bucket>,
        endpoint_key: String,
        ticket: Ticket,
    ) -> Self {
        Self {
            limiter,
            bucket,
            endpoint_key,
            ticket,
            active: AtomicBool::new(true),
            transmitted: AtomicBool::new(false),
        }
    }

    pub fn bucket_id(&self) -> &BucketId {
        self.bucket.id()
    }

    /// Neither completed nor cancelled yet
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Admitted speculatively before the bucket limit was known
    pub fn is_probe(&self) -> bool {
        self.ticket.probe
    }

    /// Pass the global request gate
    ///
    /// Waits for the single global slot (FIFO) and for any global cooldown to
    /// expire. The slot is held until the returned handle is dropped, so the
    /// gate orders requests only up to the point the caller drops it. The
    /// REST client drops it once the request has been handed to the HTTP
    /// connection pool; from then on the contract counts as transmitted.
    pub async fn enter_request_phase(&self) -> Result<RequestHandle, RateLimitError> {
        if !self.is_active() {
            return Err(RateLimitError::ContractReleased);
        }

        let permit = self.limiter.pass_global_gate().await;
        self.transmitted.store(true, Ordering::Release);

        tracing::trace!(bucket = %self.bucket.id(), "Entered request phase");

        Ok(RequestHandle {
            _permit: permit,
            bucket: self.bucket.id().clone(),
        })
    }

    /// Finish with the rate-limit data of the response
    ///
    /// Returns `false` if the contract had already ended.
    pub fn complete(&self, info: RateLimitInfo) -> bool {
        if !self.release() {
            tracing::trace!(bucket = %self.bucket.id(), "Contract already released, ignoring completion");
            return false;
        }

        self.bucket.complete(self.ticket, &info);

        if let (Some(retry_after), false) = (info.retry_after, info.global) {
            self.limiter.emit(RateLimitEvent::RouteLimited {
                bucket: self.bucket.id().clone(),
                retry_after,
            });
        }

        if let Some(hash) = info.bucket.as_deref() {
            self.limiter.record_hash(&self.endpoint_key, &self.bucket, hash);
        }

        true
    }

    /// Release the slot without response data
    ///
    /// Returns `false` if the contract had already ended.
    pub fn cancel(&self) -> bool {
        if !self.release() {
            return false;
        }

        self.bucket
            .cancel(self.ticket, self.transmitted.load(Ordering::Acquire));
        true
    }

    /// Release the slot of a request that never reached the server
    ///
    /// Like [`cancel`](Self::cancel), but refunds the slot even after the
    /// request phase, e.g. when the connection could not be established.
    pub fn cancel_unsent(&self) -> bool {
        if !self.release() {
            return false;
        }

        self.bucket.cancel(self.ticket, false);
        true
    }

    fn release(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}

impl Drop for Contract {
    fn drop(&mut self) {
        if self.is_active() {
            tracing::debug!(bucket = %self.bucket.id(), "Contract dropped while active, cancelling");
            self.cancel();
        }
    }
}

impl std::fmt::Debug for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contract")
            .field("bucket", self.bucket.id())
            .field("probe", &self.ticket.probe)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Holds the global request gate; dropping it lets the next request through
#[must_use = "the global gate is released as soon as the handle is dropped"]
pub struct RequestHandle {
    _permit: OwnedMutexGuard<()>,
    bucket: BucketId,
}

impl RequestHandle {
    pub fn bucket_id(&self) -> &BucketId {
        &self.bucket
    }
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("bucket", &self.bucket)
            .finish()
    }
}
