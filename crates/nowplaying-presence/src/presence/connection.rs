//! Background driver task: executes [`PresenceMachine`] actions against a
//! real socket and real timers.

use std::collections::VecDeque;
use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use nowplaying_common::{new_connection_id, ConnectionId, PresenceError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

use crate::snapshot::PresenceSnapshot;

use super::machine::{Action, ConnectionState, Input, PresenceMachine};
use super::transport::{Connection, Connector, Frame};
use super::types::{ConnectionStatus, PresenceConfig};

/// Upper bound on a graceful socket close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) type PresenceSink = Box<dyn FnMut(PresenceSnapshot) + Send + 'static>;
pub(crate) type StatusSink = Box<dyn FnMut(&ConnectionStatus) + Send + 'static>;

type ConnectFuture =
    Pin<Box<dyn Future<Output = Result<Box<dyn Connection>, PresenceError>> + Send>>;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Requests from [`super::PresenceClient`] handles.
pub(crate) enum Command {
    Start {
        user_id: String,
        ack: oneshot::Sender<()>,
    },
    Stop {
        ack: oneshot::Sender<()>,
    },
    Reconnect {
        ack: oneshot::Sender<()>,
    },
    SetPresenceSink(PresenceSink),
    SetStatusSink(StatusSink),
}

/// What woke the driver loop.
enum Wake {
    Command(Option<Command>),
    ConnectDone(Result<Box<dyn Connection>, PresenceError>),
    Frame(Option<Result<Frame, PresenceError>>),
    Heartbeat,
    Reconnect,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub(crate) struct Driver {
    config: PresenceConfig,
    connector: Arc<dyn Connector>,
    machine: PresenceMachine,
    state_tx: watch::Sender<ConnectionState>,
    status_tx: watch::Sender<ConnectionStatus>,
    presence_sink: Option<PresenceSink>,
    status_sink: Option<StatusSink>,

    /// Correlation id of the current connection attempt.
    conn_id: Option<ConnectionId>,
    connecting: Option<ConnectFuture>,
    connection: Option<Box<dyn Connection>>,
    heartbeat: Option<Interval>,
    reconnect_at: Option<Pin<Box<Sleep>>>,
}

impl Driver {
    pub(crate) fn new(
        config: PresenceConfig,
        connector: Arc<dyn Connector>,
        state_tx: watch::Sender<ConnectionState>,
        status_tx: watch::Sender<ConnectionStatus>,
    ) -> Self {
        let machine = PresenceMachine::new(config.reconnect_policy());
        Self {
            config,
            connector,
            machine,
            state_tx,
            status_tx,
            presence_sink: None,
            status_sink: None,
            conn_id: None,
            connecting: None,
            connection: None,
            heartbeat: None,
            reconnect_at: None,
        }
    }

    /// Run until every client handle is dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let wake = tokio::select! {
                biased;
                cmd = commands.recv() => Wake::Command(cmd),
                result = wait_connect(&mut self.connecting) => Wake::ConnectDone(result),
                frame = wait_frame(&mut self.connection) => Wake::Frame(frame),
                _ = wait_tick(&mut self.heartbeat) => Wake::Heartbeat,
                _ = wait_sleep(&mut self.reconnect_at) => Wake::Reconnect,
            };

            match wake {
                Wake::Command(None) => {
                    debug!("all presence client handles dropped, shutting down");
                    self.apply(Input::Stop).await;
                    break;
                }
                Wake::Command(Some(cmd)) => self.on_command(cmd).await,
                Wake::ConnectDone(result) => {
                    self.connecting = None;
                    match result {
                        Ok(connection) => {
                            debug!(conn = self.conn(), "socket open");
                            self.connection = Some(connection);
                            self.apply(Input::Opened).await;
                        }
                        Err(e) => {
                            warn!(conn = self.conn(), error = %e, "connect attempt failed");
                            self.apply(Input::Closed {
                                reason: e.to_string(),
                            })
                            .await;
                        }
                    }
                }
                Wake::Frame(Some(Ok(Frame::Text(text)))) => self.apply(Input::Frame(text)).await,
                Wake::Frame(Some(Ok(Frame::Close))) => self.apply(Input::CloseReceived).await,
                Wake::Frame(Some(Err(e))) => {
                    warn!(conn = self.conn(), error = %e, "socket error");
                    self.connection = None;
                    self.apply(Input::Closed {
                        reason: e.to_string(),
                    })
                    .await;
                }
                Wake::Frame(None) => {
                    self.connection = None;
                    self.apply(Input::Closed {
                        reason: "connection closed".to_string(),
                    })
                    .await;
                }
                Wake::Heartbeat => self.apply(Input::HeartbeatDue).await,
                Wake::Reconnect => {
                    self.reconnect_at = None;
                    self.apply(Input::ReconnectDue).await;
                }
            }
        }
    }

    async fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Start { user_id, ack } => {
                self.apply(Input::Start { user_id }).await;
                let _ = ack.send(());
            }
            Command::Stop { ack } => {
                self.apply(Input::Stop).await;
                let _ = ack.send(());
            }
            Command::Reconnect { ack } => {
                self.apply(Input::Restart).await;
                let _ = ack.send(());
            }
            Command::SetPresenceSink(sink) => self.presence_sink = Some(sink),
            Command::SetStatusSink(sink) => self.status_sink = Some(sink),
        }
    }

    /// Feed an input through the machine and execute the resulting actions.
    /// Failures while executing (a send error) become follow-up inputs.
    async fn apply(&mut self, input: Input) {
        let mut queue = VecDeque::from([input]);
        while let Some(input) = queue.pop_front() {
            for action in self.machine.handle(input) {
                if let Some(follow_up) = self.execute(action).await {
                    queue.push_back(follow_up);
                }
            }
            self.publish_state();
        }
    }

    async fn execute(&mut self, action: Action) -> Option<Input> {
        match action {
            Action::Connect => self.begin_connect(),
            Action::Disconnect => self.disconnect().await,
            Action::Send(message) => {
                let Some(connection) = self.connection.as_mut() else {
                    debug!(opcode = message.opcode(), "no socket, dropping outbound frame");
                    return None;
                };
                let result = connection.send_text(message.encode()).await;
                if let Err(e) = result {
                    warn!(conn = self.conn(), opcode = message.opcode(), error = %e, "send failed");
                    return Some(Input::Closed {
                        reason: e.to_string(),
                    });
                }
            }
            Action::StartHeartbeat(period) => {
                let mut interval = time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.heartbeat = Some(interval);
                debug!(interval_ms = period.as_millis() as u64, "heartbeat started");
            }
            Action::StopHeartbeat => self.heartbeat = None,
            Action::ScheduleReconnect(delay) => {
                self.reconnect_at = Some(Box::pin(time::sleep(delay)));
            }
            Action::CancelReconnect => self.reconnect_at = None,
            Action::Render(snapshot) => {
                if let Some(sink) = self.presence_sink.as_mut() {
                    sink(snapshot);
                }
            }
            Action::Status(status) => {
                if let Some(sink) = self.status_sink.as_mut() {
                    sink(&status);
                }
                self.status_tx.send_replace(status);
            }
        }
        None
    }

    fn begin_connect(&mut self) {
        let conn_id = new_connection_id();
        info!(conn = %conn_id, url = %self.config.relay_url, "connecting to presence relay");
        self.conn_id = Some(conn_id);

        let connector = Arc::clone(&self.connector);
        let url = self.config.relay_url.clone();
        let connect_timeout = self.config.connect_timeout;
        self.connecting = Some(Box::pin(async move {
            match time::timeout(connect_timeout, connector.connect(&url)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(PresenceError::Timeout(connect_timeout.as_secs())),
            }
        }));
    }

    async fn disconnect(&mut self) {
        self.connecting = None;
        if let Some(mut connection) = self.connection.take() {
            debug!(conn = self.conn(), "closing socket");
            if time::timeout(CLOSE_TIMEOUT, connection.close()).await.is_err() {
                debug!(conn = self.conn(), "socket close timed out");
            }
        }
    }

    fn conn(&self) -> &str {
        self.conn_id.as_ref().map_or("-", ConnectionId::as_str)
    }

    fn publish_state(&self) {
        let state = self.machine.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Optional wake sources
// ---------------------------------------------------------------------------

async fn wait_connect(
    connecting: &mut Option<ConnectFuture>,
) -> Result<Box<dyn Connection>, PresenceError> {
    match connecting {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn wait_frame(
    connection: &mut Option<Box<dyn Connection>>,
) -> Option<Result<Frame, PresenceError>> {
    match connection {
        Some(connection) => connection.next_frame().await,
        None => pending().await,
    }
}

async fn wait_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn wait_sleep(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}
