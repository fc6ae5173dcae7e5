//! Session actor
//!
//! One task owns the transport connection, the [`Session`] and every timer.
//! Incoming frames, heartbeat ticks, outbound commands and shutdown are
//! multiplexed with `select!`, so transitions are applied one at a time.

use super::GatewayConfig;
use crate::broadcast::EventDispatcher;
use crate::error::{GatewayError, GatewayResult};
use crate::events::SessionEvent;
use crate::handlers::{Action, MessageDispatcher};
use crate::protocol::{
    CloseAction, CloseCode, GatewayMessage, OpCode, NORMAL_CLOSURE, RECONNECT_CLOSURE,
};
use crate::session::{Backoff, ConnectionState, HeartbeatTick, SendWindow, Session, SessionStatus};
use crate::transport::{Transport, TransportConnection, TransportMessage};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace, warn};

/// A frame queued by a [`GatewayClient`](super::GatewayClient) handle
pub(crate) struct Outbound {
    pub(crate) frame: GatewayMessage,
    pub(crate) reply: oneshot::Sender<GatewayResult<()>>,
}

impl Outbound {
    fn reject(self, error: GatewayError) {
        // The sender may have stopped waiting
        let _ = self.reply.send(Err(error));
    }
}

/// Why a connection ended
enum Exit {
    Shutdown,
    Reconnect { resumable: bool },
    Fatal { code: u16, reason: String },
}

/// Deadlines tracked for the open connection
#[derive(Debug, Default)]
struct Timers {
    heartbeat: Option<Instant>,
    /// Delayed Identify or Resume after Invalid Session
    handshake: Option<Instant>,
    /// Ready or Resumed must arrive before this
    handshake_deadline: Option<Instant>,
}

pub(crate) struct Runner {
    config: Arc<GatewayConfig>,
    transport: Arc<dyn Transport>,
    session: Session,
    /// Frames sent on the current connection, heartbeats excluded
    send_window: SendWindow,
    /// Identify frames, across connections
    identify_window: SendWindow,
    dispatcher: Arc<EventDispatcher>,
    events: broadcast::Sender<SessionEvent>,
    status: watch::Sender<SessionStatus>,
    outbound: mpsc::Receiver<Outbound>,
    shutdown: watch::Receiver<bool>,
}

impl Runner {
    pub(crate) fn new(
        config: Arc<GatewayConfig>,
        transport: Arc<dyn Transport>,
        dispatcher: Arc<EventDispatcher>,
        events: broadcast::Sender<SessionEvent>,
        status: watch::Sender<SessionStatus>,
        outbound: mpsc::Receiver<Outbound>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let backoff = Backoff::new(
            config.backoff.base,
            config.backoff.max,
            config.backoff.jitter,
        );

        let send_window = SendWindow::new(config.send_limit, config.send_period);
        let identify_window = SendWindow::new(1, config.identify_interval);

        Self {
            config,
            transport,
            session: Session::new(backoff),
            send_window,
            identify_window,
            dispatcher,
            events,
            status,
            outbound,
            shutdown,
        }
    }

    /// Connect, and keep reconnecting until shut down or closed fatally
    pub(crate) async fn run(mut self) -> GatewayResult<()> {
        loop {
            let url = self.next_url();
            self.session.connecting();
            self.publish();

            info!(url = %url, resume = self.session.can_resume(), "Connecting to gateway");

            let opened = tokio::select! {
                biased;
                () = stopped(&mut self.shutdown) => {
                    self.finish(Some(NORMAL_CLOSURE), "client disconnected");
                    return Ok(());
                }
                result = time::timeout(self.config.connect_timeout, self.transport.connect(&url)) => result,
            };

            let exit = match opened {
                Ok(Ok(conn)) => {
                    self.session.opened();
                    self.publish();
                    self.drive(conn).await
                }
                Ok(Err(e)) => {
                    warn!(url = %url, error = %e, "Failed to connect to gateway");
                    Exit::Reconnect { resumable: true }
                }
                Err(_) => {
                    warn!(
                        url = %url,
                        timeout_ms = self.config.connect_timeout.as_millis(),
                        "Timed out connecting to gateway"
                    );
                    Exit::Reconnect { resumable: true }
                }
            };

            match exit {
                Exit::Shutdown => {
                    self.finish(Some(NORMAL_CLOSURE), "client disconnected");
                    return Ok(());
                }
                Exit::Fatal { code, reason } => {
                    let err = GatewayError::from_close(code, &reason);
                    error!(code, reason = %reason, "Gateway closed the session for good");
                    self.finish(Some(code), &reason);
                    return Err(err);
                }
                Exit::Reconnect { resumable } => {
                    if !self.back_off(resumable).await {
                        self.finish(Some(NORMAL_CLOSURE), "client disconnected");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Mark the session closed without ever having connected
    pub(crate) fn abandon(mut self) {
        self.finish(None, "client disconnected");
    }

    fn next_url(&self) -> String {
        match self.session.resume_url() {
            Some(url) if self.session.can_resume() => url.to_string(),
            _ => self.config.url.clone(),
        }
    }

    /// Wait out the reconnect delay; `false` if shut down meanwhile
    async fn back_off(&mut self, resumable: bool) -> bool {
        let delay = self.session.disconnected(resumable);
        let attempt = self.session.attempts();
        self.publish();

        info!(attempt, resumable, delay_ms = delay.as_millis(), "Reconnecting to gateway");
        self.notify(SessionEvent::Reconnecting {
            attempt,
            resumable,
            delay,
        });

        let wake = Instant::now() + delay;
        loop {
            tokio::select! {
                biased;
                () = stopped(&mut self.shutdown) => return false,
                () = time::sleep_until(wake) => return true,
                Some(outbound) = self.outbound.recv() => outbound.reject(GatewayError::NotConnected),
            }
        }
    }

    /// Run one connection until it ends
    async fn drive(&mut self, mut conn: Box<dyn TransportConnection>) -> Exit {
        let mut timers = Timers {
            handshake_deadline: Some(Instant::now() + self.config.connect_timeout),
            ..Timers::default()
        };
        self.send_window.reset();

        loop {
            // Outbound frames stay queued while the send budget is spent
            let send_blocked = self.send_window.blocked_until(Instant::now());

            tokio::select! {
                biased;
                () = stopped(&mut self.shutdown) => {
                    close(conn.as_mut(), NORMAL_CLOSURE, "client disconnected").await;
                    return Exit::Shutdown;
                }
                Some(outbound) = self.outbound.recv(), if send_blocked.is_none() => {
                    if self.session.state() == ConnectionState::Connected {
                        self.count_send();
                        let result = send_frame(conn.as_mut(), &outbound.frame).await;
                        let _ = outbound.reply.send(result);
                    } else {
                        outbound.reject(GatewayError::NotConnected);
                    }
                }
                () = wait_until(send_blocked) => {
                    trace!("Send budget replenished");
                }
                () = wait_until(timers.heartbeat) => {
                    match self.session.heartbeat_tick(Instant::now()) {
                        HeartbeatTick::Send(seq) => {
                            timers.heartbeat = self.session.heartbeat_interval().map(|interval| Instant::now() + interval);
                            trace!(seq = ?seq, "Sending heartbeat");
                            if let Err(e) = send_frame(conn.as_mut(), &GatewayMessage::heartbeat(seq)).await {
                                warn!(error = %e, "Failed to send heartbeat");
                            }
                        }
                        HeartbeatTick::Zombie => {
                            warn!(session_id = ?self.session.session_id(), "Heartbeat not acknowledged, connection is a zombie");
                            close(conn.as_mut(), RECONNECT_CLOSURE, "heartbeat not acknowledged").await;
                            return Exit::Reconnect { resumable: true };
                        }
                    }
                }
                () = wait_until(timers.handshake) => {
                    timers.handshake = None;
                    timers.handshake_deadline = Some(Instant::now() + self.config.connect_timeout);
                    let frame = MessageDispatcher::handshake(&mut self.session, &self.config);
                    self.publish();
                    self.send_handshake(conn.as_mut(), frame, &mut timers).await;
                }
                () = wait_until(timers.handshake_deadline) => {
                    warn!(
                        state = %self.session.state(),
                        timeout_ms = self.config.connect_timeout.as_millis(),
                        "Handshake timed out"
                    );
                    close(conn.as_mut(), RECONNECT_CLOSURE, "handshake timed out").await;
                    return Exit::Reconnect { resumable: true };
                }
                received = conn.recv() => {
                    let decoded = match received {
                        Some(Ok(TransportMessage::Text(text))) => GatewayMessage::from_json(&text),
                        Some(Ok(TransportMessage::Binary(bytes))) => GatewayMessage::from_slice(&bytes),
                        Some(Ok(TransportMessage::Close(frame))) => return self.closed_by_server(frame),
                        Some(Err(e)) => {
                            warn!(error = %e, "Gateway connection failed");
                            return Exit::Reconnect { resumable: true };
                        }
                        None => {
                            warn!("Gateway connection dropped without a close frame");
                            return Exit::Reconnect { resumable: true };
                        }
                    };

                    let frame = match decoded {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(error = %e, "Dropping undecodable frame");
                            continue;
                        }
                    };

                    trace!(op = %frame.op, t = ?frame.t, s = ?frame.s, "Received frame");

                    let actions = match MessageDispatcher::dispatch(&mut self.session, &self.config, frame, Instant::now()) {
                        Ok(actions) => actions,
                        Err(e) => {
                            warn!(error = %e, "Dropping frame");
                            continue;
                        }
                    };

                    for action in actions {
                        if let Some(exit) = self.apply(action, conn.as_mut(), &mut timers).await {
                            return exit;
                        }
                    }
                    self.publish();
                }
            }
        }
    }

    async fn apply(
        &mut self,
        action: Action,
        conn: &mut dyn TransportConnection,
        timers: &mut Timers,
    ) -> Option<Exit> {
        match action {
            Action::Send(frame) => match frame.op {
                OpCode::Identify | OpCode::Resume => self.send_handshake(conn, frame, timers).await,
                op => {
                    if op != OpCode::Heartbeat {
                        self.count_send();
                    }
                    if let Err(e) = send_frame(conn, &frame).await {
                        warn!(op = %frame.op, error = %e, "Failed to send frame");
                    }
                }
            },
            Action::StartHeartbeat(interval) => {
                let first = if self.config.heartbeat_jitter {
                    interval.mul_f64(rand::thread_rng().gen::<f64>())
                } else {
                    interval
                };
                debug!(
                    interval_ms = interval.as_millis(),
                    first_ms = first.as_millis(),
                    "Heartbeat started"
                );
                timers.heartbeat = Some(Instant::now() + first);
            }
            Action::Dispatch(event) => {
                self.dispatcher.dispatch(&event);
            }
            Action::Notify(event) => {
                if matches!(event, SessionEvent::Ready { .. } | SessionEvent::Resumed { .. }) {
                    timers.handshake_deadline = None;
                    self.publish();
                }
                self.notify(event);
            }
            Action::Reconnect { resumable } => {
                close(conn, RECONNECT_CLOSURE, "reconnect requested").await;
                return Some(Exit::Reconnect { resumable });
            }
            Action::Handshake { delay } => {
                debug!(delay_ms = delay.as_millis(), "Handshake scheduled");
                timers.handshake = Some(Instant::now() + delay);
                timers.handshake_deadline = None;
            }
        }
        None
    }

    /// Send Identify or Resume, unless Identify must wait for its interval
    ///
    /// A held-back Identify is rebuilt by the handshake timer once allowed.
    async fn send_handshake(
        &mut self,
        conn: &mut dyn TransportConnection,
        frame: GatewayMessage,
        timers: &mut Timers,
    ) {
        let now = Instant::now();
        if frame.op == OpCode::Identify {
            if let Some(until) = self.identify_window.blocked_until(now) {
                debug!(
                    wait_ms = until.saturating_duration_since(now).as_millis(),
                    "Identify rate limited, delaying"
                );
                timers.handshake = Some(until);
                timers.handshake_deadline = None;
                return;
            }
            self.identify_window.record(now);
        }

        self.count_send();
        if let Err(e) = send_frame(conn, &frame).await {
            warn!(op = %frame.op, error = %e, "Failed to send handshake");
        }
    }

    fn count_send(&mut self) {
        let now = Instant::now();
        self.send_window.record(now);
        if let Some(until) = self.send_window.blocked_until(now) {
            debug!(
                sent = self.send_window.used(),
                wait_ms = until.saturating_duration_since(now).as_millis(),
                "Send limit reached, holding outbound frames"
            );
        }
    }

    fn closed_by_server(&self, frame: Option<(u16, String)>) -> Exit {
        let (code, reason) = match frame {
            Some((code, reason)) => (Some(code), reason),
            None => (None, String::new()),
        };

        match (CloseCode::classify(code), code) {
            (CloseAction::Fatal, Some(code)) => Exit::Fatal { code, reason },
            (CloseAction::Reidentify, _) => {
                info!(code = ?code, reason = %reason, "Gateway closed the connection, session lost");
                Exit::Reconnect { resumable: false }
            }
            _ => {
                info!(code = ?code, reason = %reason, "Gateway closed the connection");
                Exit::Reconnect { resumable: true }
            }
        }
    }

    fn finish(&mut self, code: Option<u16>, reason: &str) {
        self.session.close();
        self.publish();

        info!(code = ?code, reason = %reason, "Gateway session closed");
        self.notify(SessionEvent::Closed {
            code,
            reason: reason.to_string(),
        });

        while let Ok(outbound) = self.outbound.try_recv() {
            outbound.reject(GatewayError::Closed);
        }
    }

    fn publish(&self) {
        let next = self.session.status();
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn notify(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

/// Resolves once shutdown is requested or every client handle is gone
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn send_frame(conn: &mut dyn TransportConnection, frame: &GatewayMessage) -> GatewayResult<()> {
    let json = frame.to_json()?;
    conn.send(TransportMessage::Text(json)).await?;
    Ok(())
}

async fn close(conn: &mut dyn TransportConnection, code: u16, reason: &str) {
    if let Err(e) = conn.close(code, reason).await {
        debug!(code, error = %e, "Failed to close connection cleanly");
    }
}
