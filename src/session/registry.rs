//! Session registry and inbound message dispatch
//!
//! The registry owns every [`PeerSession`], keyed by remote peer id, and
//! is the single place inbound signaling is routed. It runs inside one
//! event context: handlers take `&mut self` and are driven one message at
//! a time by the client loop.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::codec::{catalog, CodecDescriptor, MediaKind};
use crate::config::CallConfig;
use crate::events::{CallEvent, EventSink};
use crate::media::MediaSource;
use crate::peer::{EndpointFactory, PeerSession};
use crate::signaling::protocol::{IceCandidate, Incoming, SignalingMessage};
use crate::signaling::queue::SignalingQueue;
use crate::{Error, Result};

/// Owner of all peer sessions for one local participant
pub struct SessionRegistry {
    local_user: String,
    room: Option<String>,
    config: CallConfig,
    audio_codec: CodecDescriptor,
    video_codec: CodecDescriptor,
    sessions: HashMap<String, PeerSession>,
    queue: SignalingQueue,
    endpoint_factory: Box<dyn EndpointFactory>,
    media_source: Box<dyn MediaSource>,
    events: EventSink,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("local_user", &self.local_user)
            .field("room", &self.room)
            .field("session_count", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Build a registry for `local_user`.
    ///
    /// Codec names from the configuration are resolved here so an unknown
    /// codec fails at startup, not mid-call.
    pub fn new(
        local_user: impl Into<String>,
        config: CallConfig,
        endpoint_factory: Box<dyn EndpointFactory>,
        media_source: Box<dyn MediaSource>,
        outbound: mpsc::UnboundedSender<SignalingMessage>,
        events: EventSink,
    ) -> Result<Self> {
        let catalog = catalog();
        let audio_codec = *catalog.lookup(MediaKind::Audio, &config.audio_codec)?;
        let video_codec = *catalog.lookup(MediaKind::Video, &config.video_codec)?;

        Ok(Self {
            local_user: local_user.into(),
            room: None,
            config,
            audio_codec,
            video_codec,
            sessions: HashMap::new(),
            queue: SignalingQueue::new(outbound),
            endpoint_factory,
            media_source,
            events,
        })
    }

    pub fn local_user(&self) -> &str {
        &self.local_user
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, peer_id: &str) -> Option<&PeerSession> {
        self.sessions.get(peer_id)
    }

    /// Announce the local user to the relay and remember the room.
    pub fn join_room(&mut self, room: impl Into<String>) -> Result<()> {
        let room = room.into();
        info!("Joining room '{}' as '{}'", room, self.local_user);
        self.queue.send_now(SignalingMessage::JoinRoom {
            room: room.clone(),
            user: self.local_user.clone(),
        })?;
        self.room = Some(room);
        Ok(())
    }

    /// Close every session and tell the relay we left.
    pub async fn leave_room(&mut self) -> Result<()> {
        info!("Leaving room as '{}'", self.local_user);
        self.close_all().await;
        self.room = None;
        self.queue.send_now(SignalingMessage::Leave)
    }

    /// Start (or restart) negotiation towards `peer_id`.
    ///
    /// Acquires local media first when the configured constraints request
    /// any tracks; a session without media offers receive-only.
    pub async fn call_to(&mut self, peer_id: &str) -> Result<()> {
        if peer_id == self.local_user {
            debug!("Not calling self ({})", peer_id);
            return Ok(());
        }
        self.ensure_session(peer_id)?;
        let Some(session) = self.sessions.get_mut(peer_id) else {
            return Err(Error::PeerNotFound(peer_id.to_string()));
        };

        let wants_media = self.config.constraints.audio || self.config.constraints.video;
        if wants_media && !session.has_local_media() {
            let media = self.media_source.acquire(self.config.constraints).await?;
            session.attach_local_media(media).await?;
        }
        session.create_offer(&mut self.queue).await
    }

    /// Tear down one peer and notify the relay.
    ///
    /// The wire message names the peer being hung up, not us; the relay
    /// routes it to that peer.
    pub async fn hang_up(&mut self, peer_id: &str) -> Result<()> {
        if !self.sessions.contains_key(peer_id) {
            return Err(Error::PeerNotFound(peer_id.to_string()));
        }
        self.queue.send_now(SignalingMessage::Hangup {
            sender: peer_id.to_string(),
        })?;
        self.remove(peer_id).await
    }

    /// Forward a locally gathered candidate to its peer.
    ///
    /// Candidates are gated per peer until that peer's answer round-trip
    /// completes.
    pub fn handle_local_candidate(
        &mut self,
        peer_id: &str,
        candidate: IceCandidate,
    ) -> Result<()> {
        self.queue.enqueue(
            peer_id,
            SignalingMessage::OnIceCandidate {
                sender: peer_id.to_string(),
                candidate,
            },
        )
    }

    /// Remove and close one session.
    pub async fn remove(&mut self, peer_id: &str) -> Result<()> {
        let Some(mut session) = self.sessions.remove(peer_id) else {
            return Err(Error::PeerNotFound(peer_id.to_string()));
        };
        self.queue.forget(peer_id);
        if let Err(e) = session.close().await {
            warn!("Session for {} closed with endpoint error: {}", peer_id, e);
        }
        self.events.emit(CallEvent::SessionClosed {
            peer_id: peer_id.to_string(),
        });
        Ok(())
    }

    /// Reconcile sessions against a roster snapshot.
    ///
    /// Closes every session whose peer is absent from `roster`. Applying
    /// the same roster twice removes nothing the second time and emits no
    /// duplicate close events.
    pub async fn remove_all_except(&mut self, roster: &[String]) {
        let stale: Vec<String> = self
            .sessions
            .keys()
            .filter(|id| !roster.iter().any(|name| name == *id))
            .cloned()
            .collect();
        for peer_id in stale {
            debug!("Peer {} absent from roster, closing", peer_id);
            if let Err(e) = self.remove(&peer_id).await {
                warn!("Failed to close stale session for {}: {}", peer_id, e);
            }
        }
    }

    /// Route one inbound signaling frame.
    pub async fn handle_incoming(&mut self, incoming: Incoming) -> Result<()> {
        match incoming {
            Incoming::RelayError(relay_error) => {
                error!(
                    "Relay reported an error (code {:?}): {}, abandoning room",
                    relay_error.code, relay_error.message
                );
                self.close_all().await;
                self.room = None;
                self.events.emit(CallEvent::RelayFailed(relay_error));
                Ok(())
            }
            Incoming::Message(message) => self.handle_message(message).await,
        }
    }

    async fn handle_message(&mut self, message: SignalingMessage) -> Result<()> {
        match message {
            SignalingMessage::ReceiveVideoFrom { sender, sdp_offer } => {
                self.apply_offer(&sender, &sdp_offer).await
            }
            SignalingMessage::ReceiveVideoAnswer { name, sdp_answer } => {
                self.apply_answer(&name, &sdp_answer).await
            }
            SignalingMessage::IceCandidate { name, candidate }
            | SignalingMessage::OnIceCandidate {
                sender: name,
                candidate,
            } => self.apply_candidate(&name, candidate).await,
            SignalingMessage::NewParticipantArrived { name } => {
                if name == self.local_user {
                    return Ok(());
                }
                info!("Participant arrived: {}", name);
                self.events.emit(CallEvent::ParticipantJoined { name: name.clone() });
                if self.config.auto_call {
                    self.call_to(&name).await?;
                }
                Ok(())
            }
            SignalingMessage::ParticipantLeaved { name } => {
                info!("Participant left: {}", name);
                if self.sessions.contains_key(&name) {
                    self.remove(&name).await?;
                }
                self.events.emit(CallEvent::ParticipantLeft { name });
                Ok(())
            }
            SignalingMessage::Hangup { sender } => {
                // `sender` names the peer the hangup concerns: a remote
                // party hanging up on us sends our own name.
                if sender == self.local_user {
                    info!("Remote party hung up on us");
                    self.close_all().await;
                } else if self.sessions.contains_key(&sender) {
                    info!("Hanging up session with {}", sender);
                    self.remove(&sender).await?;
                }
                Ok(())
            }
            SignalingMessage::ExistingParticipants { data } => {
                self.handle_roster(data).await
            }
            SignalingMessage::JoinRoom { .. } | SignalingMessage::Leave => {
                warn!("Ignoring outbound-only command received from relay");
                Ok(())
            }
        }
    }

    async fn apply_offer(&mut self, sender: &str, sdp_offer: &str) -> Result<()> {
        self.ensure_session(sender)?;
        let Some(session) = self.sessions.get_mut(sender) else {
            return Err(Error::PeerNotFound(sender.to_string()));
        };
        session
            .apply_remote_offer(
                sdp_offer,
                self.media_source.as_ref(),
                self.config.constraints,
                &mut self.queue,
            )
            .await?;
        self.events.emit(CallEvent::SessionStable {
            peer_id: sender.to_string(),
        });
        Ok(())
    }

    async fn apply_answer(&mut self, name: &str, sdp_answer: &str) -> Result<()> {
        let Some(session) = self.sessions.get_mut(name) else {
            return Err(Error::PeerNotFound(name.to_string()));
        };
        // The answer is proof the remote connection exists; release its
        // gated candidates.
        self.queue.flush(name)?;
        session.apply_remote_answer(sdp_answer).await?;
        self.events.emit(CallEvent::SessionStable {
            peer_id: name.to_string(),
        });
        Ok(())
    }

    async fn apply_candidate(&mut self, name: &str, candidate: IceCandidate) -> Result<()> {
        // Candidates may outrun the offer that introduces the peer.
        self.ensure_session(name)?;
        let Some(session) = self.sessions.get_mut(name) else {
            return Err(Error::PeerNotFound(name.to_string()));
        };
        session.apply_remote_candidate(candidate).await
    }

    async fn handle_roster(&mut self, roster: Vec<String>) -> Result<()> {
        info!("Received room roster with {} participants", roster.len());
        self.remove_all_except(&roster).await;
        self.events.emit(CallEvent::RoomJoined {
            room: self.room.clone().unwrap_or_default(),
            participants: roster.clone(),
        });

        if !self.config.auto_call {
            return Ok(());
        }
        for name in roster {
            if name == self.local_user || self.sessions.contains_key(&name) {
                continue;
            }
            // One unreachable participant must not abort the rest.
            if let Err(e) = self.call_to(&name).await {
                warn!("Failed to call roster participant {}: {}", name, e);
            }
        }
        Ok(())
    }

    fn ensure_session(&mut self, peer_id: &str) -> Result<()> {
        if let Entry::Vacant(entry) = self.sessions.entry(peer_id.to_string()) {
            let endpoint = self.endpoint_factory.create(peer_id)?;
            entry.insert(PeerSession::new(
                peer_id.to_string(),
                endpoint,
                self.audio_codec,
                self.video_codec,
            ));
        }
        Ok(())
    }

    async fn close_all(&mut self) {
        let peer_ids: Vec<String> = self.sessions.keys().cloned().collect();
        for peer_id in peer_ids {
            if let Err(e) = self.remove(&peer_id).await {
                warn!("Failed to close session for {}: {}", peer_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codec_fails_at_construction() {
        struct NoFactory;
        impl EndpointFactory for NoFactory {
            fn create(&self, _peer_id: &str) -> Result<Box<dyn crate::peer::MediaEndpoint>> {
                Err(Error::Endpoint("unused".into()))
            }
        }

        struct NoMedia;
        #[async_trait::async_trait]
        impl MediaSource for NoMedia {
            async fn acquire(
                &self,
                _constraints: crate::media::MediaConstraints,
            ) -> Result<Box<dyn crate::media::LocalMedia>> {
                Err(Error::MediaAcquisition("unused".into()))
            }
        }

        let config = CallConfig::default().with_codecs("opus", "av9000");
        let (events, _rx) = EventSink::channel();
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = SessionRegistry::new(
            "alice",
            config,
            Box::new(NoFactory),
            Box::new(NoMedia),
            tx,
            events,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownCodec { kind: MediaKind::Video, .. }));
    }
}
