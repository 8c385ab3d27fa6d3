//! Top-level call client
//!
//! Wires a connected signaling transport to a [`SessionRegistry`] and
//! pumps inbound frames through it, one at a time. All session state is
//! confined to this single driving context.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::CallConfig;
use crate::events::{CallEvent, EventSink};
use crate::media::MediaSource;
use crate::peer::EndpointFactory;
use crate::session::SessionRegistry;
use crate::signaling::client::SignalingConnector;
use crate::signaling::protocol::IceCandidate;
use crate::Result;

pub struct CallClient {
    registry: SessionRegistry,
    inbound: mpsc::UnboundedReceiver<crate::signaling::protocol::Incoming>,
}

impl CallClient {
    /// Connect the transport and build the client.
    ///
    /// Returns the client and the event stream for the UI collaborator.
    pub async fn connect(
        user: impl Into<String>,
        config: CallConfig,
        connector: &dyn SignalingConnector,
        endpoint_factory: Box<dyn EndpointFactory>,
        media_source: Box<dyn MediaSource>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CallEvent>)> {
        let user = user.into();
        let channel = connector.connect(&user, &config).await?;
        let (events, events_rx) = EventSink::channel();
        let registry = SessionRegistry::new(
            user,
            config,
            endpoint_factory,
            media_source,
            channel.outbound,
            events,
        )?;
        Ok((
            Self {
                registry,
                inbound: channel.inbound,
            },
            events_rx,
        ))
    }

    pub fn registry(&mut self) -> &mut SessionRegistry {
        &mut self.registry
    }

    pub fn join_room(&mut self, room: impl Into<String>) -> Result<()> {
        self.registry.join_room(room)
    }

    pub async fn leave_room(&mut self) -> Result<()> {
        self.registry.leave_room().await
    }

    pub async fn call_to(&mut self, peer_id: &str) -> Result<()> {
        self.registry.call_to(peer_id).await
    }

    pub async fn hang_up(&mut self, peer_id: &str) -> Result<()> {
        self.registry.hang_up(peer_id).await
    }

    /// Forward a candidate gathered by the local endpoint for `peer_id`.
    pub fn handle_local_candidate(&mut self, peer_id: &str, candidate: IceCandidate) -> Result<()> {
        self.registry.handle_local_candidate(peer_id, candidate)
    }

    /// Wait for and process one inbound frame.
    ///
    /// Returns `Ok(false)` once the transport is gone.
    pub async fn process_next(&mut self) -> Result<bool> {
        let Some(incoming) = self.inbound.recv().await else {
            info!("Signaling transport closed");
            return Ok(false);
        };
        self.registry.handle_incoming(incoming).await?;
        Ok(true)
    }

    /// Drive the client until the transport closes.
    ///
    /// Per-message handler failures are logged and skipped; a dead
    /// transport ends the loop.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.process_next().await {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => warn!("Failed to handle signaling message: {}", e),
            }
        }
    }
}
