//! WebSocket provider backed by tokio-tungstenite

use super::{Transport, TransportConnection, TransportError, TransportMessage};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Connects with `ws://` or `wss://` URLs; TLS through rustls
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn TransportConnection>, TransportError> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(url = %url, status = %response.status(), "WebSocket connected");

        Ok(Box::new(WebSocketConnection { stream }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TransportConnection for WebSocketConnection {
    async fn send(&mut self, message: TransportMessage) -> Result<(), TransportError> {
        let message = match message {
            TransportMessage::Text(text) => Message::Text(text),
            TransportMessage::Binary(bytes) => Message::Binary(bytes),
            TransportMessage::Close(frame) => Message::Close(frame.map(|(code, reason)| CloseFrame {
                code: WsCloseCode::from(code),
                reason: reason.into(),
            })),
        };

        self.stream
            .send(message)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<TransportMessage, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            };

            match message {
                Message::Text(text) => return Some(Ok(TransportMessage::Text(text))),
                Message::Binary(bytes) => return Some(Ok(TransportMessage::Binary(bytes))),
                Message::Close(frame) => {
                    let frame = frame.map(|f| (u16::from(f.code), f.reason.into_owned()));
                    return Some(Ok(TransportMessage::Close(frame)));
                }
                // Pongs are queued by tungstenite and flushed with the next write
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    tracing::trace!("WebSocket control frame");
                }
            }
        }
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: WsCloseCode::from(code),
            reason: reason.to_owned().into(),
        };

        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}
