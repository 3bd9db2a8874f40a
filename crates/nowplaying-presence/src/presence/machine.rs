//! Connection-lifecycle state machine.
//!
//! `PresenceMachine` performs no I/O. Every socket event, timer fire and
//! caller command is fed in as an [`Input`]; the machine updates its state
//! and returns the [`Action`]s the driver must carry out, in order.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::protocol::{self, events, InboundFrame, OutboundMessage};
use crate::snapshot::PresenceSnapshot;

use super::policy::ReconnectPolicy;
use super::types::ConnectionStatus;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The relay started a close handshake; the socket is not usable.
    Closing,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Inputs & Actions
// ---------------------------------------------------------------------------

/// Everything that can happen to a presence connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Caller asked to watch `user_id`.
    Start { user_id: String },
    /// Caller asked to tear everything down.
    Stop,
    /// Caller asked for a fresh connection with the last user id.
    Restart,
    /// The transport finished opening the socket.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The relay sent a close frame.
    CloseReceived,
    /// The socket failed, closed, or never opened.
    Closed { reason: String },
    /// The heartbeat timer fired.
    HeartbeatDue,
    /// The reconnect timer fired.
    ReconnectDue,
}

/// Side effects requested by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open a new socket to the relay.
    Connect,
    /// Close and drop the socket (or abandon a pending connect).
    Disconnect,
    Send(OutboundMessage),
    StartHeartbeat(Duration),
    StopHeartbeat,
    ScheduleReconnect(Duration),
    CancelReconnect,
    /// Hand a snapshot to the render sink.
    Render(PresenceSnapshot),
    /// Surface a status change to the caller.
    Status(ConnectionStatus),
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PresenceMachine {
    state: ConnectionState,
    policy: ReconnectPolicy,
    user_id: Option<String>,
    /// Active heartbeat cadence; `None` means no heartbeat timer is armed.
    heartbeat: Option<Duration>,
    /// Whether a reconnect timer is armed.
    reconnect_pending: bool,
}

impl PresenceMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            policy,
            user_id: None,
            heartbeat: None,
            reconnect_pending: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts consumed since the last successful handshake.
    pub fn attempts(&self) -> u32 {
        self.policy.attempts()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Apply one input and return the resulting actions.
    pub fn handle(&mut self, input: Input) -> Vec<Action> {
        match input {
            Input::Start { user_id } => self.on_start(user_id),
            Input::Stop => self.on_stop(),
            Input::Restart => self.on_restart(),
            Input::Opened => self.on_opened(),
            Input::Frame(text) => self.on_frame(&text),
            Input::CloseReceived => self.on_close_received(),
            Input::Closed { reason } => self.on_closed(&reason),
            Input::HeartbeatDue => self.on_heartbeat_due(),
            Input::ReconnectDue => self.on_reconnect_due(),
        }
    }

    // -- commands -----------------------------------------------------------

    fn on_start(&mut self, user_id: String) -> Vec<Action> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!(state = %self.state, "start ignored, already active");
                Vec::new()
            }
            ConnectionState::Disconnected | ConnectionState::Closing => {
                let mut actions = Vec::new();
                if self.state == ConnectionState::Closing {
                    actions.push(Action::Disconnect);
                }
                if self.reconnect_pending {
                    self.reconnect_pending = false;
                    actions.push(Action::CancelReconnect);
                }
                self.policy.reset();
                self.user_id = Some(user_id);
                self.begin_connect(&mut actions);
                actions
            }
        }
    }

    fn on_stop(&mut self) -> Vec<Action> {
        let was_idle = self.state == ConnectionState::Disconnected && !self.reconnect_pending;

        self.state = ConnectionState::Disconnected;
        self.heartbeat = None;
        self.reconnect_pending = false;

        let mut actions = vec![
            Action::StopHeartbeat,
            Action::CancelReconnect,
            Action::Disconnect,
        ];
        if !was_idle {
            info!("presence client stopped");
            actions.push(Action::Status(ConnectionStatus::Disconnected));
        }
        actions
    }

    fn on_restart(&mut self) -> Vec<Action> {
        let Some(user_id) = self.user_id.clone() else {
            debug!("restart ignored, never started");
            return Vec::new();
        };
        let mut actions = self.on_stop();
        actions.extend(self.on_start(user_id));
        actions
    }

    // -- socket -------------------------------------------------------------

    fn on_opened(&mut self) -> Vec<Action> {
        if self.state == ConnectionState::Connecting {
            debug!("socket open, awaiting handshake");
            Vec::new()
        } else {
            debug!(state = %self.state, "discarding socket opened in inactive state");
            vec![Action::Disconnect]
        }
    }

    fn on_frame(&mut self, text: &str) -> Vec<Action> {
        let frame = match protocol::parse_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                return Vec::new();
            }
        };

        match frame {
            InboundFrame::Hello { heartbeat_interval } => self.on_hello(heartbeat_interval),
            InboundFrame::Event { kind, data } => self.on_event(&kind, data),
            InboundFrame::Unknown => {
                debug!("ignoring unrecognized frame");
                Vec::new()
            }
        }
    }

    fn on_hello(&mut self, heartbeat_interval: Option<u64>) -> Vec<Action> {
        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::Connected;
                self.policy.reset();

                let mut actions = Vec::new();
                if let Some(user_id) = &self.user_id {
                    actions.push(Action::Send(OutboundMessage::Subscribe {
                        user_id: user_id.clone(),
                    }));
                }
                self.arm_heartbeat(heartbeat_interval, &mut actions);
                info!(user_id = ?self.user_id, "connected to presence relay");
                actions.push(Action::Status(ConnectionStatus::Connected));
                actions
            }
            ConnectionState::Connected => {
                let mut actions = Vec::new();
                self.arm_heartbeat(heartbeat_interval, &mut actions);
                actions
            }
            ConnectionState::Disconnected | ConnectionState::Closing => {
                debug!(state = %self.state, "ignoring handshake");
                Vec::new()
            }
        }
    }

    fn on_event(&mut self, kind: &str, data: serde_json::Value) -> Vec<Action> {
        if self.state != ConnectionState::Connected {
            debug!(kind = %kind, state = %self.state, "dropping event received before handshake");
            return Vec::new();
        }

        match kind {
            events::INIT_STATE | events::PRESENCE_UPDATE => {
                match PresenceSnapshot::from_payload(data) {
                    Ok(snapshot) => {
                        debug!(
                            kind = %kind,
                            status = snapshot.status.as_str(),
                            activities = snapshot.activities.len(),
                            "presence received"
                        );
                        vec![Action::Render(snapshot)]
                    }
                    Err(e) => {
                        warn!(kind = %kind, error = %e, "dropping invalid presence payload");
                        Vec::new()
                    }
                }
            }
            _ => {
                debug!(kind = %kind, "ignoring unhandled event");
                Vec::new()
            }
        }
    }

    fn on_close_received(&mut self) -> Vec<Action> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!("relay is closing the socket");
                self.state = ConnectionState::Closing;
                self.heartbeat = None;
                vec![Action::StopHeartbeat]
            }
            ConnectionState::Disconnected | ConnectionState::Closing => Vec::new(),
        }
    }

    fn on_closed(&mut self, reason: &str) -> Vec<Action> {
        if self.state == ConnectionState::Disconnected {
            debug!(reason = %reason, "ignoring close of an inactive socket");
            return Vec::new();
        }

        info!(reason = %reason, state = %self.state, "presence connection lost");
        self.state = ConnectionState::Disconnected;
        self.heartbeat = None;

        let mut actions = vec![Action::StopHeartbeat, Action::Disconnect];
        match self.policy.next_delay() {
            Some(delay) => {
                self.reconnect_pending = true;
                info!(
                    attempt = self.policy.attempts(),
                    max_attempts = self.policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
                actions.push(Action::ScheduleReconnect(delay));
                actions.push(Action::Status(ConnectionStatus::Reconnecting {
                    attempt: self.policy.attempts(),
                    max_attempts: self.policy.max_attempts(),
                    delay,
                }));
            }
            None => {
                warn!(
                    max_attempts = self.policy.max_attempts(),
                    "reconnect attempts exhausted"
                );
                actions.push(Action::Status(ConnectionStatus::Failed));
            }
        }
        actions
    }

    // -- timers -------------------------------------------------------------

    fn on_heartbeat_due(&mut self) -> Vec<Action> {
        if self.state == ConnectionState::Connected && self.heartbeat.is_some() {
            vec![Action::Send(OutboundMessage::Heartbeat)]
        } else {
            Vec::new()
        }
    }

    fn on_reconnect_due(&mut self) -> Vec<Action> {
        if !self.reconnect_pending || self.state != ConnectionState::Disconnected {
            return Vec::new();
        }
        self.reconnect_pending = false;
        let mut actions = Vec::new();
        self.begin_connect(&mut actions);
        actions
    }

    // -- helpers ------------------------------------------------------------

    fn begin_connect(&mut self, actions: &mut Vec<Action>) {
        self.state = ConnectionState::Connecting;
        actions.push(Action::Connect);
        actions.push(Action::Status(ConnectionStatus::Connecting));
    }

    fn arm_heartbeat(&mut self, interval_ms: Option<u64>, actions: &mut Vec<Action>) {
        match interval_ms.filter(|ms| *ms > 0) {
            Some(ms) => {
                let interval = Duration::from_millis(ms);
                self.heartbeat = Some(interval);
                actions.push(Action::StartHeartbeat(interval));
            }
            None => {
                warn!("handshake carried no heartbeat interval");
                self.heartbeat = None;
                actions.push(Action::StopHeartbeat);
            }
        }
    }
}

impl Default for PresenceMachine {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
