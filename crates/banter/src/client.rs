//! Client façade
//!
//! Wires the rate limiter, REST client and gateway session from one
//! [`ClientConfig`].

use crate::error::ClientResult;
use banter_common::ClientConfig;
use banter_gateway::{
    EventDispatcher, GatewayBuilder, GatewayClient, GatewayConfig, SessionEvent, Transport,
};
use banter_rest::{RateLimiter, RestClient, RestConfig};
use std::sync::Arc;
use tokio::sync::broadcast;

/// REST and gateway access sharing one configuration
///
/// Cheap to clone; clones share the rate limiter and the gateway session.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    rest: RestClient,
    gateway: GatewayClient,
}

impl Client {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Build a client from `BANTER_*` environment variables and `.env`
    pub fn from_env() -> ClientResult<Self> {
        ClientBuilder::new(ClientConfig::from_env()?).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn limiter(&self) -> &RateLimiter {
        self.rest.limiter()
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.gateway.session_events()
    }

    /// Connect the gateway and wait for the session to be ready
    pub async fn start(&self) -> ClientResult<()> {
        self.gateway.connect()?;
        self.gateway.wait_connected().await?;
        tracing::info!(
            session_id = ?self.gateway.status().session_id,
            "Client started"
        );
        Ok(())
    }

    /// Close the gateway session and wait for it to end
    pub async fn shutdown(&self) -> ClientResult<()> {
        self.gateway.disconnect();
        self.gateway.join().await?;
        tracing::info!("Client shut down");
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("rest", &self.rest)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Builder for [`Client`]
///
/// Everything but the configuration is optional.
pub struct ClientBuilder {
    config: ClientConfig,
    limiter: Option<RateLimiter>,
    dispatcher: Option<Arc<EventDispatcher>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            limiter: None,
            dispatcher: None,
            transport: None,
        }
    }

    /// Share a rate limiter with other clients using the same token
    #[must_use]
    pub fn limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Gateway transport; WebSocket by default
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns `ClientError::Rest` if the HTTP client cannot be created
    pub fn build(self) -> ClientResult<Client> {
        let config = self.config;

        let rest = RestClient::new(
            RestConfig::from_settings(config.token.clone(), &config.rest),
            self.limiter.unwrap_or_default(),
        )?;

        let mut gateway =
            GatewayBuilder::new(GatewayConfig::from_settings(config.token.clone(), &config.gateway));
        if let Some(transport) = self.transport {
            gateway = gateway.with_shared_transport(transport);
        }
        if let Some(dispatcher) = self.dispatcher {
            gateway = gateway.with_dispatcher(dispatcher);
        }

        tracing::debug!(
            env = ?config.env,
            api_url = %config.rest.api_url,
            gateway_url = %config.gateway.url,
            "Client built"
        );

        Ok(Client {
            config: Arc::new(config),
            rest,
            gateway: gateway.build(),
        })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}
