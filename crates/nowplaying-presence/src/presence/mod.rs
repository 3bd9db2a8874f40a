//! Presence client for the Lanyard relay.
//!
//! A pure [`PresenceMachine`] decides what to do; a background driver task
//! (see `connection`) owns the socket and timers and carries the decisions
//! out. [`PresenceClient`] is the handle callers hold.

mod client;
mod connection;
mod machine;
mod policy;
mod transport;
mod types;

pub use client::PresenceClient;
pub use machine::{Action, ConnectionState, Input, PresenceMachine};
pub use policy::ReconnectPolicy;
pub use transport::{Connection, Connector, Frame, WsConnection, WsConnector};
pub use types::{ConnectionStatus, PresenceConfig, DEFAULT_RELAY_URL};

#[cfg(test)]
mod tests;
