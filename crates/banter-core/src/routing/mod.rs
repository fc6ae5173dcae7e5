//! REST routing
//!
//! Route descriptors, the rate-limit bucket identity derived from them, and the
//! rate-limit data reported back by the server.

mod bucket_id;
mod method;
mod rate_limit_info;
mod route;

pub use bucket_id::{BucketId, BucketScope};
pub use method::HttpMethod;
pub use rate_limit_info::RateLimitInfo;
pub use route::{MajorParameter, Route};
