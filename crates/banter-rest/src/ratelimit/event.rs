//! Informational rate-limit notifications

use banter_core::BucketId;
use std::time::Duration;
use tokio::time::Instant;

/// Published on [`RateLimiter::subscribe`](super::RateLimiter::subscribe)
///
/// Events never affect admission; they exist for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitEvent {
    /// A request is suspended until the bucket resets
    BucketExhausted { bucket: BucketId, reset_at: Instant },
    /// The server answered 429 for a single route
    RouteLimited {
        bucket: BucketId,
        retry_after: Duration,
    },
    /// Every request is paused until `until`
    GlobalLimited { until: Instant },
}
