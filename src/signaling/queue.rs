//! Per-peer outbound message buffering
//!
//! Locally gathered candidates can be ready before the remote side has a
//! connection to apply them to. The queue holds routed messages per peer
//! and releases them in FIFO order once the peer is flushed (its answer
//! round-trip completed), switching to immediate-send afterwards.

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::protocol::SignalingMessage;
use crate::{Error, Result};

/// Outbound signaling buffer, keyed by remote peer
pub struct SignalingQueue {
    outbound: mpsc::UnboundedSender<SignalingMessage>,
    ready: HashSet<String>,
    buffered: HashMap<String, VecDeque<SignalingMessage>>,
}

impl SignalingQueue {
    /// Create a queue draining into `outbound` (consumed by the transport task).
    pub fn new(outbound: mpsc::UnboundedSender<SignalingMessage>) -> Self {
        Self {
            outbound,
            ready: HashSet::new(),
            buffered: HashMap::new(),
        }
    }

    /// Send `message` to `peer_id` now if the peer is ready, else buffer it.
    pub fn enqueue(&mut self, peer_id: &str, message: SignalingMessage) -> Result<()> {
        if self.ready.contains(peer_id) {
            return self.send_now(message);
        }

        debug!("Buffering outbound message for peer {} until ready", peer_id);
        self.buffered
            .entry(peer_id.to_string())
            .or_default()
            .push_back(message);
        Ok(())
    }

    /// Mark `peer_id` ready and send everything buffered for it, in order.
    ///
    /// Subsequent enqueues for this peer go out immediately.
    pub fn flush(&mut self, peer_id: &str) -> Result<()> {
        self.ready.insert(peer_id.to_string());

        let Some(mut pending) = self.buffered.remove(peer_id) else {
            return Ok(());
        };

        debug!(
            "Flushing {} buffered messages for peer {}",
            pending.len(),
            peer_id
        );
        while let Some(message) = pending.pop_front() {
            self.send_now(message)?;
        }
        Ok(())
    }

    /// Send a message that is not routed to any peer (room join/leave).
    pub fn send_now(&self, message: SignalingMessage) -> Result<()> {
        self.outbound
            .send(message)
            .map_err(|_| Error::TransportSend("outbound channel closed".into()))
    }

    /// Drop buffered messages and readiness for a removed peer.
    pub fn forget(&mut self, peer_id: &str) {
        self.ready.remove(peer_id);
        if let Some(pending) = self.buffered.remove(peer_id) {
            if !pending.is_empty() {
                warn!(
                    "Dropping {} undelivered messages for peer {}",
                    pending.len(),
                    peer_id
                );
            }
        }
    }

    /// Whether the peer is in immediate-send mode.
    pub fn is_ready(&self, peer_id: &str) -> bool {
        self.ready.contains(peer_id)
    }
}
