//! Test fixtures and configuration builders

use banter_common::ClientConfig;
use banter_gateway::{BackoffConfig, GatewayConfig};
use banter_rest::RestConfig;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Token every mock server accepts
pub const TEST_TOKEN: &str = "integration-token";

/// Session id handed out by the mock gateway
pub const TEST_SESSION_ID: &str = "integration-session";

/// Requests per window on the mock message endpoints
pub const MESSAGE_LIMIT: u32 = 2;

/// Window length on the mock message endpoints
pub const MESSAGE_WINDOW: Duration = Duration::from_millis(500);

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique id for test data
pub fn unique_id() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Create message request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessage {
    pub content: String,
}

impl CreateMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Message returned by the mock API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub channel_id: String,
    pub content: String,
}

/// REST configuration pointing at a mock API
pub fn rest_config(api_url: &str) -> RestConfig {
    RestConfig::new(api_url, TEST_TOKEN)
        .with_timeout(Duration::from_secs(5))
        .with_bad_gateway_delay(Duration::from_millis(20))
}

/// Gateway configuration with short, deterministic timings
pub fn gateway_config(url: &str) -> GatewayConfig {
    GatewayConfig::new(url, TEST_TOKEN)
        .with_heartbeat_jitter(false)
        .with_connect_timeout(Duration::from_secs(5))
        .with_identify_interval(Duration::from_millis(50))
        .with_backoff(BackoffConfig {
            base: Duration::from_millis(50),
            max: Duration::from_millis(500),
            jitter: Duration::ZERO,
        })
}

/// Full client configuration for both mock servers
pub fn client_config(api_url: &str, gateway_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(TEST_TOKEN);
    config.rest.api_url = api_url.to_string();
    config.rest.timeout_ms = 5_000;
    config.gateway.url = gateway_url.to_string();
    config.gateway.heartbeat_jitter = false;
    config.gateway.reconnect_base_ms = 50;
    config.gateway.reconnect_max_ms = 500;
    config.gateway.identify_interval_ms = 50;
    config
}
