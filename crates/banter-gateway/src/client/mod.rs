//! Gateway client
//!
//! [`GatewayBuilder`] wires a [`GatewayConfig`], a transport and an event
//! dispatcher into a [`GatewayClient`] handle. The session itself runs on a
//! spawned task once [`GatewayClient::connect`] is called.

mod builder;
mod config;
mod gateway_client;
mod runner;

pub use builder::GatewayBuilder;
pub use config::{BackoffConfig, GatewayConfig};
pub use gateway_client::GatewayClient;
