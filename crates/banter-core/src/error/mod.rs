//! Core error types

mod route_error;

pub use route_error::RouteError;
