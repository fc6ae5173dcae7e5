//! Bucket registry, global gate and global cooldown

use super::bucket::{Bucket, BucketSnapshot};
use super::{Contract, RateLimitEvent};
use banter_core::{BucketId, Route};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::{self, Instant};

/// Broadcast buffer for rate-limit events
const EVENT_BUFFER: usize = 64;

/// Per-client rate limiter
///
/// Cheap to clone; clones share buckets, the global gate and the cooldown.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<LimiterInner>,
}

struct LimiterInner {
    buckets: DashMap<BucketId, Arc<Bucket>>,
    /// Endpoint key -> server-assigned bucket hash
    hashes: DashMap<String, String>,
    /// FIFO single-slot gate every request passes before transmission
    gate: Arc<AsyncMutex<()>>,
    global_until: parking_lot::Mutex<Option<Instant>>,
    events: broadcast::Sender<RateLimitEvent>,
}

impl RateLimiter {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Arc::new(LimiterInner {
                buckets: DashMap::new(),
                hashes: DashMap::new(),
                gate: Arc::new(AsyncMutex::new(())),
                global_until: parking_lot::Mutex::new(None),
                events,
            }),
        }
    }

    /// Suspend until the route's bucket admits a request
    pub async fn acquire_contract(&self, route: &Route) -> Contract {
        let bucket = self.bucket_for(route);
        let ticket = bucket.admit(&self.inner.events).await;

        tracing::trace!(bucket = %bucket.id(), probe = ticket.probe, "Contract acquired");

        Contract::new(self.clone(), bucket, route.endpoint_key(), ticket)
    }

    /// Pause every request until `until`
    ///
    /// A trigger earlier than the current cooldown is ignored.
    pub fn trigger_global_limit(&self, until: Instant) {
        let extended = {
            let mut global = self.inner.global_until.lock();
            if global.map_or(true, |current| until > current) {
                *global = Some(until);
                true
            } else {
                false
            }
        };

        if extended {
            tracing::warn!(
                cooldown_ms = until.saturating_duration_since(Instant::now()).as_millis(),
                "Global rate limit triggered"
            );
            self.emit(RateLimitEvent::GlobalLimited { until });
        }
    }

    /// End of the active global cooldown, if any
    pub fn global_cooldown(&self) -> Option<Instant> {
        let until = *self.inner.global_until.lock();
        until.filter(|until| *until > Instant::now())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RateLimitEvent> {
        self.inner.events.subscribe()
    }

    /// Current state of the bucket a route resolves to, without creating it
    pub fn bucket_snapshot(&self, route: &Route) -> Option<BucketSnapshot> {
        let id = self.resolve_id(route);
        self.inner
            .buckets
            .get(&id)
            .map(|bucket| bucket.value().snapshot())
    }

    /// Registered bucket ids, including hash aliases
    pub fn bucket_count(&self) -> usize {
        self.inner.buckets.len()
    }

    pub(crate) async fn pass_global_gate(&self) -> OwnedMutexGuard<()> {
        let permit = Arc::clone(&self.inner.gate).lock_owned().await;

        loop {
            let until = *self.inner.global_until.lock();
            match until {
                Some(until) if until > Instant::now() => {
                    tracing::debug!(
                        wait_ms = until.saturating_duration_since(Instant::now()).as_millis(),
                        "Waiting out global cooldown"
                    );
                    time::sleep_until(until).await;
                }
                _ => break,
            }
        }

        permit
    }

    /// Remember the hash of an endpoint and alias its bucket under the hash scope
    pub(crate) fn record_hash(&self, endpoint_key: &str, bucket: &Arc<Bucket>, hash: &str) {
        let known = self
            .inner
            .hashes
            .get(endpoint_key)
            .is_some_and(|known| known.value() == hash);
        if !known {
            tracing::debug!(endpoint = %endpoint_key, hash = %hash, "Learned bucket hash");
            self.inner
                .hashes
                .insert(endpoint_key.to_string(), hash.to_string());
        }

        if bucket.id().is_hash() {
            return;
        }

        let hash_id = bucket.id().with_hash(hash);
        self.inner.buckets.entry(hash_id).or_insert_with(|| {
            tracing::debug!(bucket = %bucket.id(), hash = %hash, "Promoting bucket to hash scope");
            Arc::clone(bucket)
        });
    }

    pub(crate) fn emit(&self, event: RateLimitEvent) {
        // No receivers is fine
        let _ = self.inner.events.send(event);
    }

    fn resolve_id(&self, route: &Route) -> BucketId {
        let learned = self
            .inner
            .hashes
            .get(&route.endpoint_key())
            .map(|hash| hash.value().clone());
        route.bucket_id(route.bucket_hash().or(learned.as_deref()))
    }

    fn bucket_for(&self, route: &Route) -> Arc<Bucket> {
        let id = self.resolve_id(route);
        if let Some(bucket) = self.inner.buckets.get(&id) {
            return Arc::clone(bucket.value());
        }

        let entry = self.inner.buckets.entry(id.clone()).or_insert_with(|| {
            tracing::debug!(bucket = %id, "Creating bucket");
            Arc::new(Bucket::new(id))
        });
        Arc::clone(entry.value())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("buckets", &self.inner.buckets.len())
            .field("global_until", &*self.inner.global_until.lock())
            .finish()
    }
}
