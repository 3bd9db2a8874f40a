//! Live Discord presence over the Lanyard relay socket.
//!
//! [`PresenceClient`] keeps one subscription alive (handshake, subscribe,
//! heartbeat, reconnect with backoff) and hands each validated
//! [`PresenceSnapshot`] to a caller-supplied render sink. The transition
//! logic lives in [`PresenceMachine`], which performs no I/O and can be
//! driven directly in tests.

pub mod presence;
pub mod protocol;
pub mod render;
pub mod snapshot;

pub use presence::{
    Action, ConnectionState, ConnectionStatus, Connection, Connector, Frame, Input,
    PresenceClient, PresenceConfig, PresenceMachine, ReconnectPolicy, WsConnector,
};
pub use protocol::{InboundFrame, OutboundMessage};
pub use snapshot::{
    Activity, AvatarDecoration, DiscordStatus, DiscordUser, PresenceSnapshot, SpotifyTrack,
    Timestamps,
};
