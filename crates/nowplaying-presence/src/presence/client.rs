//! Caller-facing handle to a presence connection.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::snapshot::PresenceSnapshot;

use super::connection::{Command, Driver};
use super::machine::ConnectionState;
use super::transport::{Connector, WsConnector};
use super::types::{ConnectionStatus, PresenceConfig};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Live subscription to one Discord user's presence on the relay.
///
/// Construction spawns a driver task that owns the socket and both timers.
/// Dropping the client stops the driver and closes the socket. Must be
/// created inside a Tokio runtime.
pub struct PresenceClient {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl PresenceClient {
    /// Client that talks to the relay over a real WebSocket.
    pub fn new(config: PresenceConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Client with a custom transport.
    pub fn with_connector(config: PresenceConfig, connector: Arc<dyn Connector>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

        let driver = Driver::new(config, connector, state_tx, status_tx);
        tokio::spawn(driver.run(command_rx));

        Self {
            commands: command_tx,
            state_rx,
            status_rx,
        }
    }

    /// Begin watching `user_id`. No-op while already connecting or connected.
    pub async fn start(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        self.request(|ack| Command::Start { user_id, ack }).await;
    }

    /// Close the socket and cancel every timer. Once this returns no sink
    /// is invoked until the next `start`.
    pub async fn stop(&self) {
        self.request(|ack| Command::Stop { ack }).await;
    }

    /// Drop the current connection and start over with the last user id.
    pub async fn reconnect(&self) {
        self.request(|ack| Command::Reconnect { ack }).await;
    }

    /// Register the render sink. Replaces any previous one.
    pub fn on_presence_update<F>(&self, callback: F)
    where
        F: FnMut(PresenceSnapshot) + Send + 'static,
    {
        self.send(Command::SetPresenceSink(Box::new(callback)));
    }

    /// Register a sink for connection status changes. Replaces any previous one.
    pub fn on_status_change<F>(&self, callback: F)
    where
        F: FnMut(&ConnectionStatus) + Send + 'static,
    {
        self.send(Command::SetStatusSink(Box::new(callback)));
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Last status surfaced by the driver.
    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// Resolve once the connection reaches `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) {
        let mut rx = self.state_rx.clone();
        if rx.wait_for(|state| *state == target).await.is_err() {
            debug!(target = %target, "driver exited while waiting for state");
        }
    }

    async fn request(&self, make: impl FnOnce(oneshot::Sender<()>) -> Command) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(make(ack_tx));
        let _ = ack_rx.await;
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("presence driver is gone, dropping command");
        }
    }
}

impl std::fmt::Debug for PresenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceClient")
            .field("state", &self.state())
            .field("status", &self.status())
            .finish()
    }
}
