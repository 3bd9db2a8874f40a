//! Socket seam between the connection driver and the network.
//!
//! The driver only talks to [`Connector`] and [`Connection`]; production
//! uses the `tokio-tungstenite` implementation below, tests plug in an
//! in-memory fake.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use nowplaying_common::PresenceError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// A frame surfaced to the driver. Binary, ping and pong frames are not
/// part of the relay protocol and never reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// The peer sent a close frame.
    Close,
}

/// One open socket.
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: String) -> Result<(), PresenceError>;

    /// Next frame from the peer. `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<Result<Frame, PresenceError>>;

    /// Best-effort close. Errors are swallowed.
    async fn close(&mut self);
}

/// Opens sockets to the relay.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, PresenceError>;
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, PresenceError> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| PresenceError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WsConnection { stream }))
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<(), PresenceError> {
        self.stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| PresenceError::Transport(e.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<Frame, PresenceError>> {
        loop {
            match self.stream.next().await? {
                Ok(WsMessage::Text(text)) => {
                    return Some(Ok(Frame::Text(text.as_str().to_owned())));
                }
                Ok(WsMessage::Close(frame)) => {
                    debug!(frame = ?frame, "relay sent close frame");
                    return Some(Ok(Frame::Close));
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(PresenceError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "websocket close failed");
        }
    }
}
