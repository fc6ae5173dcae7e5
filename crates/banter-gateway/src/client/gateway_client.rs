//! Handle to a running gateway session

use super::runner::{Outbound, Runner};
use super::GatewayConfig;
use crate::broadcast::{EventDispatcher, EventStream};
use crate::error::{GatewayError, GatewayResult};
use crate::events::SessionEvent;
use crate::protocol::{
    GatewayMessage, PresenceUpdatePayload, RequestGuildMembersPayload, VoiceStateUpdatePayload,
};
use crate::session::{ConnectionState, SessionStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Gateway client
///
/// Cheap to clone; every clone controls the same session. Dropping the last
/// clone shuts the session down.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Arc<GatewayConfig>,
    dispatcher: Arc<EventDispatcher>,
    events: broadcast::Sender<SessionEvent>,
    status: watch::Receiver<SessionStatus>,
    outbound: mpsc::Sender<Outbound>,
    shutdown: watch::Sender<bool>,
    /// Held until `connect` spawns it
    runner: Mutex<Option<Runner>>,
    task: Mutex<Option<JoinHandle<GatewayResult<()>>>>,
}

impl GatewayClient {
    pub(crate) fn new(
        config: Arc<GatewayConfig>,
        dispatcher: Arc<EventDispatcher>,
        events: broadcast::Sender<SessionEvent>,
        status: watch::Receiver<SessionStatus>,
        outbound: mpsc::Sender<Outbound>,
        shutdown: watch::Sender<bool>,
        runner: Runner,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                dispatcher,
                events,
                status,
                outbound,
                shutdown,
                runner: Mutex::new(Some(runner)),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.inner.dispatcher
    }

    /// Start the session on a background task
    ///
    /// Returns immediately; watch [`status`](Self::status) or
    /// [`session_events`](Self::session_events) to follow the handshake.
    /// Calling it again while running does nothing.
    pub fn connect(&self) -> GatewayResult<()> {
        let Some(runner) = self.inner.runner.lock().take() else {
            return if self.status().state.is_terminal() {
                Err(GatewayError::Closed)
            } else {
                Ok(())
            };
        };

        tracing::debug!(url = %self.inner.config.url, "Starting gateway session");
        *self.inner.task.lock() = Some(tokio::spawn(runner.run()));
        Ok(())
    }

    /// Every dispatch event, in the order the gateway sent them
    pub fn subscribe(&self) -> EventStream {
        self.inner.dispatcher.subscribe()
    }

    /// Dispatch events with one of the given names
    pub fn subscribe_to<I, S>(&self, names: I) -> EventStream
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.dispatcher.subscribe_to(names)
    }

    /// Lifecycle notifications: ready, resumed, invalidated, reconnecting, closed
    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.clone()
    }

    /// Wait until the session is connected
    ///
    /// Fails with [`GatewayError::Closed`] if the session ends first.
    pub async fn wait_connected(&self) -> GatewayResult<()> {
        let mut status = self.inner.status.clone();
        let state = status
            .wait_for(|s| s.state == ConnectionState::Connected || s.state.is_terminal())
            .await
            .map_err(|_| GatewayError::Closed)?
            .state;

        if state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(GatewayError::Closed)
        }
    }

    /// Send a frame on the current connection
    ///
    /// Only possible while connected; a failed send does not end the session.
    pub async fn send(&self, frame: GatewayMessage) -> GatewayResult<()> {
        match self.status().state {
            ConnectionState::Closed => return Err(GatewayError::Closed),
            ConnectionState::Connected => {}
            _ => return Err(GatewayError::NotConnected),
        }

        let (reply, response) = oneshot::channel();
        self.inner
            .outbound
            .send(Outbound { frame, reply })
            .await
            .map_err(|_| GatewayError::Closed)?;

        response.await.map_err(|_| GatewayError::Closed)?
    }

    pub async fn update_presence(&self, presence: &PresenceUpdatePayload) -> GatewayResult<()> {
        self.send(GatewayMessage::presence_update(presence)).await
    }

    pub async fn update_voice_state(&self, voice: &VoiceStateUpdatePayload) -> GatewayResult<()> {
        self.send(GatewayMessage::voice_state_update(voice)).await
    }

    /// Ask for guild members; they arrive as `GUILD_MEMBERS_CHUNK` events
    pub async fn request_guild_members(
        &self,
        request: &RequestGuildMembersPayload,
    ) -> GatewayResult<()> {
        self.send(GatewayMessage::request_guild_members(request)).await
    }

    /// Close the session for good
    ///
    /// Interrupts any wait in progress, including a reconnect backoff. Use
    /// [`join`](Self::join) to wait for the session task to finish.
    pub fn disconnect(&self) {
        tracing::debug!("Gateway disconnect requested");
        self.inner.shutdown.send_replace(true);

        if let Some(runner) = self.inner.runner.lock().take() {
            runner.abandon();
        }
    }

    /// Wait for the session task to end
    ///
    /// Returns the fatal error that ended the session, if any.
    pub async fn join(&self) -> GatewayResult<()> {
        let task = self.inner.task.lock().take();
        match task {
            Some(task) => task.await.map_err(|_| GatewayError::Closed)?,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("config", &self.inner.config)
            .field("status", &*self.inner.status.borrow())
            .finish()
    }
}
