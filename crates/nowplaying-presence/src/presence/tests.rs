//! Driver tests against an in-memory relay under a paused clock.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nowplaying_common::PresenceError;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

use super::*;
use crate::snapshot::{DiscordStatus, PresenceSnapshot};

const USER: &str = "688967048541503506";
const HELLO: &str = r#"{"op":1,"d":{"heartbeat_interval":1000}}"#;
const IDLE_UPDATE: &str =
    r#"{"op":0,"d":{"t":"PRESENCE_UPDATE","d":{"discord_status":"idle","activities":[]}}}"#;

// =============================================================================
// Fake relay
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Accept,
    Refuse,
    Hang,
}

struct RelayState {
    outcomes: VecDeque<Outcome>,
    fallback: Outcome,
    attempts: Vec<Instant>,
    sent: Vec<String>,
    closed: usize,
    server: Option<mpsc::UnboundedSender<Result<Frame, PresenceError>>>,
}

#[derive(Clone)]
struct FakeRelay {
    inner: Arc<Mutex<RelayState>>,
}

impl FakeRelay {
    fn new(fallback: Outcome) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RelayState {
                outcomes: VecDeque::new(),
                fallback,
                attempts: Vec::new(),
                sent: Vec::new(),
                closed: 0,
                server: None,
            })),
        }
    }

    fn accepting() -> Self {
        Self::new(Outcome::Accept)
    }

    fn script(self, outcomes: &[Outcome]) -> Self {
        self.inner.lock().unwrap().outcomes.extend(outcomes);
        self
    }

    fn client(&self, config: PresenceConfig) -> PresenceClient {
        PresenceClient::with_connector(config, Arc::new(self.clone()))
    }

    fn push(&self, text: &str) {
        if let Some(server) = &self.inner.lock().unwrap().server {
            let _ = server.send(Ok(Frame::Text(text.to_string())));
        }
    }

    fn push_close(&self) {
        if let Some(server) = &self.inner.lock().unwrap().server {
            let _ = server.send(Ok(Frame::Close));
        }
    }

    /// End the current socket's stream, as a network drop would.
    fn drop_connection(&self) {
        self.inner.lock().unwrap().server = None;
    }

    fn attempts(&self) -> Vec<Instant> {
        self.inner.lock().unwrap().attempts.clone()
    }

    fn sent(&self) -> Vec<Value> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    fn heartbeats(&self) -> usize {
        self.sent().iter().filter(|v| v["op"] == 3).count()
    }

    fn closed(&self) -> usize {
        self.inner.lock().unwrap().closed
    }
}

#[async_trait]
impl Connector for FakeRelay {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Connection>, PresenceError> {
        let outcome = {
            let mut state = self.inner.lock().unwrap();
            state.attempts.push(Instant::now());
            state.outcomes.pop_front().unwrap_or(state.fallback)
        };

        match outcome {
            Outcome::Accept => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.inner.lock().unwrap().server = Some(tx);
                Ok(Box::new(FakeConnection {
                    frames: rx,
                    relay: self.clone(),
                }))
            }
            Outcome::Refuse => Err(PresenceError::Connect("connection refused".into())),
            Outcome::Hang => pending().await,
        }
    }
}

struct FakeConnection {
    frames: mpsc::UnboundedReceiver<Result<Frame, PresenceError>>,
    relay: FakeRelay,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn send_text(&mut self, text: String) -> Result<(), PresenceError> {
        self.relay.inner.lock().unwrap().sent.push(text);
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<Frame, PresenceError>> {
        self.frames.recv().await
    }

    async fn close(&mut self) {
        self.relay.inner.lock().unwrap().closed += 1;
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Let the driver task drain everything that is ready without moving time.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn record_presence(client: &PresenceClient) -> Arc<Mutex<Vec<PresenceSnapshot>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.on_presence_update(move |snapshot| sink.lock().unwrap().push(snapshot));
    seen
}

fn record_status(client: &PresenceClient) -> Arc<Mutex<Vec<ConnectionStatus>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.on_status_change(move |status| sink.lock().unwrap().push(status.clone()));
    seen
}

async fn connected_client(relay: &FakeRelay) -> PresenceClient {
    let client = relay.client(PresenceConfig::default());
    client.start(USER).await;
    settle().await;
    relay.push(HELLO);
    client.wait_for_state(ConnectionState::Connected).await;
    client
}

fn millis_between(instants: &[Instant]) -> Vec<u64> {
    instants
        .windows(2)
        .map(|w| (w[1] - w[0]).as_millis() as u64)
        .collect()
}

// =============================================================================
// Handshake & events
// =============================================================================

#[tokio::test(start_paused = true)]
async fn handshake_subscribes_and_renders_update_once() {
    let relay = FakeRelay::accepting();
    let client = relay.client(PresenceConfig::default());
    let seen = record_presence(&client);

    client.start(USER).await;
    settle().await;
    assert_eq!(client.state(), ConnectionState::Connecting);
    assert_eq!(relay.attempts().len(), 1);

    relay.push(HELLO);
    client.wait_for_state(ConnectionState::Connected).await;
    assert_eq!(client.status(), ConnectionStatus::Connected);

    let sent = relay.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["op"], 2);
    assert_eq!(sent[0]["d"]["subscribe_to_id"], USER);

    relay.push(IDLE_UPDATE);
    settle().await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].status, DiscordStatus::Idle);
    assert!(seen[0].activities.is_empty());
}

#[tokio::test(start_paused = true)]
async fn event_before_handshake_is_not_rendered() {
    let relay = FakeRelay::accepting();
    let client = relay.client(PresenceConfig::default());
    let seen = record_presence(&client);

    client.start(USER).await;
    settle().await;
    relay.push(IDLE_UPDATE);
    settle().await;

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn malformed_frame_keeps_connection() {
    let relay = FakeRelay::accepting();
    let client = connected_client(&relay).await;
    let seen = record_presence(&client);

    relay.push("{oops");
    relay.push(r#"{"op":0,"t":"PRESENCE_UPDATE","d":"not an object"}"#);
    relay.push(IDLE_UPDATE);
    settle().await;

    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(relay.attempts().len(), 1);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

// =============================================================================
// Heartbeat
// =============================================================================

#[tokio::test(start_paused = true)]
async fn heartbeat_follows_handshake_interval_until_stop() {
    let relay = FakeRelay::accepting();
    let client = connected_client(&relay).await;

    sleep(Duration::from_millis(3500)).await;
    assert_eq!(relay.heartbeats(), 3);

    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(relay.closed(), 1);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(relay.heartbeats(), 3);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_frames_carry_only_opcode() {
    let relay = FakeRelay::accepting();
    let _client = connected_client(&relay).await;

    sleep(Duration::from_millis(1500)).await;
    let sent = relay.sent();
    assert_eq!(sent.last(), Some(&serde_json::json!({ "op": 3 })));
}

// =============================================================================
// Reconnect & backoff
// =============================================================================

#[tokio::test(start_paused = true)]
async fn backoff_doubles_then_fails_after_budget() {
    let relay = FakeRelay::new(Outcome::Refuse);
    let client = relay.client(PresenceConfig::default());
    let statuses = record_status(&client);

    client.start(USER).await;
    sleep(Duration::from_secs(60)).await;

    let attempts = relay.attempts();
    assert_eq!(attempts.len(), 6);
    let expected = [1000u64, 2000, 4000, 8000, 16000];
    for (actual, expected) in millis_between(&attempts).into_iter().zip(expected) {
        assert!(
            actual.abs_diff(expected) <= 5,
            "expected ~{expected}ms between attempts, got {actual}ms"
        );
    }

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.status(), ConnectionStatus::Failed);

    let statuses = statuses.lock().unwrap();
    let reconnecting: Vec<u32> = statuses
        .iter()
        .filter_map(|s| match s {
            ConnectionStatus::Reconnecting { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(reconnecting, vec![1, 2, 3, 4, 5]);
    assert_eq!(statuses.last(), Some(&ConnectionStatus::Failed));
}

#[tokio::test(start_paused = true)]
async fn start_after_failure_retries() {
    let relay = FakeRelay::new(Outcome::Refuse);
    let client = relay.client(PresenceConfig::default());

    client.start(USER).await;
    sleep(Duration::from_secs(60)).await;
    assert_eq!(client.status(), ConnectionStatus::Failed);

    client.start(USER).await;
    settle().await;
    assert_eq!(relay.attempts().len(), 7);
    assert!(matches!(
        client.status(),
        ConnectionStatus::Reconnecting { attempt: 1, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn stop_suppresses_scheduled_reconnect() {
    let relay = FakeRelay::new(Outcome::Refuse);
    let client = relay.client(PresenceConfig::default());

    client.start(USER).await;
    settle().await;
    assert!(matches!(
        client.status(),
        ConnectionStatus::Reconnecting { attempt: 1, .. }
    ));

    client.stop().await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(relay.attempts().len(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn successful_handshake_resets_backoff() {
    let relay = FakeRelay::accepting().script(&[Outcome::Refuse, Outcome::Refuse]);
    let client = relay.client(PresenceConfig::default());
    let statuses = record_status(&client);

    client.start(USER).await;
    // Refused at 0s and 1s, accepted at 3s.
    sleep(Duration::from_millis(3100)).await;
    assert_eq!(relay.attempts().len(), 3);

    relay.push(HELLO);
    client.wait_for_state(ConnectionState::Connected).await;

    relay.drop_connection();
    settle().await;

    assert_eq!(
        statuses.lock().unwrap().last(),
        Some(&ConnectionStatus::Reconnecting {
            attempt: 1,
            max_attempts: 5,
            delay: Duration::from_millis(1000),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn connect_timeout_counts_as_failed_attempt() {
    let relay = FakeRelay::new(Outcome::Hang);
    let config = PresenceConfig {
        connect_timeout: Duration::from_secs(15),
        ..PresenceConfig::default()
    };
    let client = relay.client(config);

    client.start(USER).await;
    sleep(Duration::from_millis(15_500)).await;
    assert_eq!(relay.attempts().len(), 1);
    assert!(matches!(
        client.status(),
        ConnectionStatus::Reconnecting { attempt: 1, .. }
    ));

    sleep(Duration::from_secs(1)).await;
    assert_eq!(relay.attempts().len(), 2);
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn relay_close_frame_passes_through_closing() {
    let relay = FakeRelay::accepting();
    let client = connected_client(&relay).await;

    relay.push_close();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Closing);

    relay.drop_connection();
    settle().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(relay.attempts().len(), 2);
    assert_eq!(client.state(), ConnectionState::Connecting);
}

// =============================================================================
// Commands
// =============================================================================

#[tokio::test(start_paused = true)]
async fn start_while_connecting_is_noop() {
    let relay = FakeRelay::new(Outcome::Hang);
    let client = relay.client(PresenceConfig::default());

    client.start(USER).await;
    settle().await;
    client.start(USER).await;
    settle().await;

    assert_eq!(relay.attempts().len(), 1);
    assert_eq!(client.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn no_render_after_stop() {
    let relay = FakeRelay::accepting();
    let client = connected_client(&relay).await;
    let seen = record_presence(&client);

    client.stop().await;
    relay.push(IDLE_UPDATE);
    settle().await;

    assert!(seen.lock().unwrap().is_empty());
    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn manual_reconnect_opens_fresh_socket() {
    let relay = FakeRelay::accepting();
    let client = connected_client(&relay).await;

    client.reconnect().await;
    settle().await;

    assert_eq!(relay.closed(), 1);
    assert_eq!(relay.attempts().len(), 2);
    assert_eq!(client.state(), ConnectionState::Connecting);

    relay.push(HELLO);
    client.wait_for_state(ConnectionState::Connected).await;
    let subscribes = relay.sent().iter().filter(|v| v["op"] == 2).count();
    assert_eq!(subscribes, 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_client_closes_socket() {
    let relay = FakeRelay::accepting();
    let client = connected_client(&relay).await;

    drop(client);
    settle().await;

    assert_eq!(relay.closed(), 1);
}
