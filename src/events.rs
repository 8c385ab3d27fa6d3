//! Call lifecycle events surfaced to the embedding layer
//!
//! The registry pushes these over an unbounded channel; the embedding
//! layer (UI, bot logic, test harness) consumes them at its own pace.

use tokio::sync::mpsc;
use tracing::warn;

use crate::signaling::protocol::RelayError;

/// Observable call lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// The room was joined; `participants` is the roster at entry
    RoomJoined {
        room: String,
        participants: Vec<String>,
    },
    /// A remote participant entered the room
    ParticipantJoined { name: String },
    /// A remote participant left the room
    ParticipantLeft { name: String },
    /// Offer/answer exchange with the peer completed
    SessionStable { peer_id: String },
    /// The session to the peer was torn down
    SessionClosed { peer_id: String },
    /// The relay rejected a request; the room has been abandoned
    RelayFailed(RelayError),
}

/// Sender half handed to the registry
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<CallEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event; a gone consumer is logged, not fatal.
    pub fn emit(&self, event: CallEvent) {
        if self.tx.send(event).is_err() {
            warn!("Event consumer dropped, discarding call event");
        }
    }
}
