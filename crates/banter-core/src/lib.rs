//! # banter-core
//!
//! Wire-independent types shared by the REST and gateway engines: identifiers,
//! gateway intents, route descriptors and rate-limit bookkeeping data.
//! This crate has no dependencies on networking or async runtimes.

pub mod error;
pub mod routing;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::RouteError;
pub use routing::{BucketId, BucketScope, HttpMethod, MajorParameter, RateLimitInfo, Route};
pub use value_objects::{GatewayIntents, Snowflake, SnowflakeParseError};
