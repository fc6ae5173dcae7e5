//! In-process provider
//!
//! [`MemoryTransport`] hands every connection attempt to a [`MemoryServer`],
//! which accepts it as a [`MemoryPeer`] and plays the gateway side. Used to
//! drive sessions deterministically in tests and to embed a gateway in-process.

use super::{Transport, TransportConnection, TransportError, TransportMessage};
use crate::protocol::GatewayMessage;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Client side of an in-memory link
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    incoming: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryTransport {
    /// Create a transport and the server that receives its connections
    pub fn new() -> (Self, MemoryServer) {
        let (incoming, accept) = mpsc::unbounded_channel();
        (Self { incoming }, MemoryServer { accept })
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn TransportConnection>, TransportError> {
        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            url: url.to_string(),
            outgoing: to_client,
            incoming: from_client,
        };
        self.incoming
            .send(peer)
            .map_err(|_| TransportError::Connect("memory server is gone".to_string()))?;

        Ok(Box::new(MemoryConnection {
            outgoing: to_server,
            incoming: from_server,
            closed: false,
        }))
    }
}

/// Accepts connections made through the paired [`MemoryTransport`]
#[derive(Debug)]
pub struct MemoryServer {
    accept: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryServer {
    /// Next connection; `None` once every transport clone is dropped
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept.recv().await
    }

    /// A connection that was already made, without waiting
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.accept.try_recv().ok()
    }
}

/// Server side of one in-memory connection
///
/// Dropping the peer looks like the connection vanished without a close frame.
#[derive(Debug)]
pub struct MemoryPeer {
    url: String,
    outgoing: mpsc::UnboundedSender<TransportMessage>,
    incoming: mpsc::UnboundedReceiver<TransportMessage>,
}

impl MemoryPeer {
    /// URL the client connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a frame as text; returns `false` once the client is gone
    pub fn send(&self, frame: &GatewayMessage) -> bool {
        match frame.to_json() {
            Ok(json) => self.send_raw(TransportMessage::Text(json)),
            Err(_) => false,
        }
    }

    pub fn send_raw(&self, message: TransportMessage) -> bool {
        self.outgoing.send(message).is_ok()
    }

    /// Close the connection with a close frame
    pub fn close(&self, code: u16, reason: &str) -> bool {
        self.send_raw(TransportMessage::Close(Some((code, reason.to_string()))))
    }

    /// Next raw message from the client
    pub async fn recv_raw(&mut self) -> Option<TransportMessage> {
        self.incoming.recv().await
    }

    /// Next frame from the client; `None` on close or disconnect
    ///
    /// Messages that are not valid frames are skipped.
    pub async fn recv(&mut self) -> Option<GatewayMessage> {
        loop {
            match self.incoming.recv().await? {
                TransportMessage::Text(text) => {
                    if let Ok(frame) = GatewayMessage::from_json(&text) {
                        return Some(frame);
                    }
                }
                TransportMessage::Binary(bytes) => {
                    if let Ok(frame) = GatewayMessage::from_slice(&bytes) {
                        return Some(frame);
                    }
                }
                TransportMessage::Close(_) => return None,
            }
        }
    }
}

struct MemoryConnection {
    outgoing: mpsc::UnboundedSender<TransportMessage>,
    incoming: mpsc::UnboundedReceiver<TransportMessage>,
    closed: bool,
}

#[async_trait]
impl TransportConnection for MemoryConnection {
    async fn send(&mut self, message: TransportMessage) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.outgoing
            .send(message)
            .map_err(|_| TransportError::Send("peer is gone".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<TransportMessage, TransportError>> {
        if self.closed {
            return None;
        }
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        // The peer may already be gone
        let _ = self
            .outgoing
            .send(TransportMessage::Close(Some((code, reason.to_string()))));
        Ok(())
    }
}
