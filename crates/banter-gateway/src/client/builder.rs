//! Gateway client builder

use super::runner::Runner;
use super::{GatewayClient, GatewayConfig};
use crate::broadcast::EventDispatcher;
use crate::session::SessionStatus;
use crate::transport::{Transport, WebSocketTransport};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Frames queued by callers before the session task picks them up
const OUTBOUND_BUFFER: usize = 32;

/// Session notifications kept for slow subscribers
const SESSION_EVENT_BUFFER: usize = 64;

/// Builder for [`GatewayClient`]
///
/// Uses [`WebSocketTransport`] and a fresh [`EventDispatcher`] unless told
/// otherwise.
pub struct GatewayBuilder {
    config: GatewayConfig,
    transport: Option<Arc<dyn Transport>>,
    dispatcher: Option<Arc<EventDispatcher>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            transport: None,
            dispatcher: None,
        }
    }

    #[must_use]
    pub fn with_transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use a transport that is shared with other clients
    #[must_use]
    pub fn with_shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Deliver dispatch events through an existing dispatcher
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn build(self) -> GatewayClient {
        let config = Arc::new(self.config);
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport));
        let dispatcher = self.dispatcher.unwrap_or_default();

        let (events, _) = broadcast::channel(SESSION_EVENT_BUFFER);
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = Runner::new(
            Arc::clone(&config),
            transport,
            Arc::clone(&dispatcher),
            events.clone(),
            status_tx,
            outbound_rx,
            shutdown_rx,
        );

        tracing::debug!(url = %config.url, intents = %config.intents, "Gateway client built");

        GatewayClient::new(
            config,
            dispatcher,
            events,
            status_rx,
            outbound_tx,
            shutdown_tx,
            runner,
        )
    }
}

impl std::fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}
