//! # banter-rest
//!
//! REST access to the chat API. Every request passes through a [`RateLimiter`]
//! that keeps per-bucket quotas and a global cooldown, so callers are suspended
//! instead of receiving rate-limit errors.

pub mod client;
pub mod error;
pub mod ratelimit;

pub use client::{RestClient, RestConfig, RestRequest};
pub use error::{RateLimitError, RestError, RestResult};
pub use ratelimit::{BucketSnapshot, Contract, RateLimitEvent, RateLimiter, RequestHandle};
