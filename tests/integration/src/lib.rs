//! Integration test utilities
//!
//! Mock servers speaking the REST and gateway protocols over real sockets, so
//! the clients can be exercised end to end.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
