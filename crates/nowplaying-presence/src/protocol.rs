//! Lanyard socket wire protocol.
//!
//! Every frame is a JSON object `{ "op": number, "d"?: object, "t"?: string }`.
//! The relay greets with `op 1` (carrying `heartbeat_interval`), pushes
//! presence with `op 0`, and expects `op 2` (subscribe) and `op 3`
//! (heartbeat) from the client.

use nowplaying_common::PresenceError;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Opcodes & event names
// ---------------------------------------------------------------------------

/// Opcodes used on the relay socket.
pub mod op {
    pub const EVENT: u64 = 0;
    pub const HELLO: u64 = 1;
    pub const INITIALIZE: u64 = 2;
    pub const HEARTBEAT: u64 = 3;
}

/// Event types carried by `op 0` frames.
pub mod events {
    pub const INIT_STATE: &str = "INIT_STATE";
    pub const PRESENCE_UPDATE: &str = "PRESENCE_UPDATE";
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A decoded frame from the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Handshake. `heartbeat_interval` is in milliseconds.
    Hello { heartbeat_interval: Option<u64> },
    /// Dispatch carrying an event type and its payload.
    Event { kind: String, data: Value },
    /// Valid JSON that is not a frame we act on.
    Unknown,
}

/// Decode one text frame.
///
/// Only text that is not JSON at all is an error; any JSON shape that does
/// not look like a known frame decodes to [`InboundFrame::Unknown`].
///
/// Events are accepted in both the relay's flat form `{op:0, t, d}` and the
/// nested form `{op:0, d:{t, d}}`.
pub fn parse_frame(text: &str) -> Result<InboundFrame, PresenceError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| PresenceError::Malformed(e.to_string()))?;

    let Some(opcode) = value.get("op").and_then(Value::as_u64) else {
        return Ok(InboundFrame::Unknown);
    };

    match opcode {
        op::HELLO => Ok(InboundFrame::Hello {
            heartbeat_interval: value
                .get("d")
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(Value::as_u64),
        }),
        op::EVENT => Ok(parse_event(&value)),
        _ => Ok(InboundFrame::Unknown),
    }
}

fn parse_event(value: &Value) -> InboundFrame {
    let data = value.get("d");

    if let Some(kind) = value.get("t").and_then(Value::as_str) {
        return InboundFrame::Event {
            kind: kind.to_string(),
            data: data.cloned().unwrap_or(Value::Null),
        };
    }

    let nested_kind = data.and_then(|d| d.get("t")).and_then(Value::as_str);
    match nested_kind {
        Some(kind) => InboundFrame::Event {
            kind: kind.to_string(),
            data: data
                .and_then(|d| d.get("d"))
                .cloned()
                .unwrap_or(Value::Null),
        },
        None => InboundFrame::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A frame the client sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Subscribe to one user's presence.
    Subscribe { user_id: String },
    /// Keep-alive.
    Heartbeat,
}

impl OutboundMessage {
    pub fn opcode(&self) -> u64 {
        match self {
            Self::Subscribe { .. } => op::INITIALIZE,
            Self::Heartbeat => op::HEARTBEAT,
        }
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn encode(&self) -> String {
        match self {
            Self::Subscribe { user_id } => json!({
                "op": op::INITIALIZE,
                "d": { "subscribe_to_id": user_id }
            })
            .to_string(),
            Self::Heartbeat => json!({ "op": op::HEARTBEAT }).to_string(),
        }
    }
}
