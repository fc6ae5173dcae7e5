//! Bucket rate limiter
//!
//! Each request first acquires a [`Contract`] against the bucket of its route,
//! then enters the request phase through the global gate, and finally reports
//! the response headers back with [`Contract::complete`] (or releases the slot
//! with [`Contract::cancel`]).

mod bucket;
mod contract;
mod event;
mod limiter;

pub use bucket::{Bucket, BucketSnapshot};
pub use contract::{Contract, RequestHandle};
pub use event::RateLimitEvent;
pub use limiter::RateLimiter;
