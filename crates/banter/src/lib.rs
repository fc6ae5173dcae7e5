//! # banter
//!
//! Client for the chat API. A [`Client`] bundles a rate-limited
//! [`RestClient`] and a [`GatewayClient`] built from one [`ClientConfig`].
//!
//! ```no_run
//! # async fn run() -> Result<(), banter::ClientError> {
//! let client = banter::Client::from_env()?;
//! let mut messages = client.gateway().subscribe_to(["MESSAGE_CREATE"]);
//! client.start().await?;
//!
//! while let Some(event) = messages.recv().await {
//!     tracing::info!(seq = ?event.sequence, "New message");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::{Client, ClientBuilder};
pub use error::{ClientError, ClientResult};

pub use banter_common::{ClientConfig, Environment, GatewaySettings, RestSettings, TracingConfig};
pub use banter_core::{GatewayIntents, HttpMethod, RateLimitInfo, Route, Snowflake};
pub use banter_gateway::{
    DispatchEvent, EventDispatcher, EventStream, GatewayClient, GatewayConfig, GatewayEventType,
    SessionEvent, SessionStatus,
};
pub use banter_rest::{RateLimiter, RestClient, RestConfig, RestRequest};

/// REST engine
pub use banter_rest as rest;

/// Gateway engine
pub use banter_gateway as gateway;

/// Install the tracing subscriber preset for the configured environment
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &ClientConfig) -> ClientResult<()> {
    banter_common::try_init_tracing_with_config(TracingConfig::for_environment(config.env))?;
    Ok(())
}
