//! HTTP client that routes every request through the rate limiter

mod config;
mod request;
mod rest_client;

pub use config::RestConfig;
pub use request::RestRequest;
pub use rest_client::RestClient;
