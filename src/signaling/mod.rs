//! Signaling: wire protocol, outbound gating, transports

pub mod client;
pub mod protocol;
pub mod queue;

pub use client::{HttpPollSignaling, SignalingChannel, SignalingConnector, WebSocketSignaling};
pub use protocol::{IceCandidate, Incoming, RelayError, SignalingMessage};
pub use queue::SignalingQueue;
