//! Error types for the call core.
//!
//! Every failure the core can produce is a typed variant here; nothing is
//! swallowed into a log line alone. Callers decide whether to retry or
//! close the affected session.

use crate::codec::MediaKind;
use crate::peer::NegotiationState;

/// Result type for meshcall operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the call core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Requested codec short-name is not in the catalog for that kind
    #[error("unknown {kind} codec: {name}")]
    UnknownCodec { kind: MediaKind, name: String },

    /// Negotiation operation invoked from a state that does not allow it
    #[error("invalid state transition: {operation} while {state:?}")]
    InvalidStateTransition {
        operation: &'static str,
        state: NegotiationState,
    },

    /// A negotiation step is already in flight on this session
    #[error("negotiation already in progress for peer {0}")]
    NegotiationInProgress(String),

    /// Local media acquisition failed (permission denied, device unavailable)
    #[error("media acquisition failed: {0}")]
    MediaAcquisition(String),

    /// Session description text could not be parsed or rewritten
    #[error("malformed session description: {0}")]
    MalformedDescription(String),

    /// Outbound signaling message could not be handed to the transport
    #[error("transport send failed: {0}")]
    TransportSend(String),

    /// No session is tracked for the given peer identifier
    #[error("peer not found: {0}")]
    PeerNotFound(String),

    /// Signaling transport or wire-format error
    #[error("signaling error: {0}")]
    Signaling(String),

    /// Failure reported by the underlying real-time media endpoint
    #[error("endpoint error: {0}")]
    Endpoint(String),
}
