//! Peer session negotiation state machine
//!
//! One `PeerSession` is one negotiated connection to a single remote
//! participant. It owns the local/remote description state, the
//! candidate buffer, and drives offer/answer exchange against the
//! [`MediaEndpoint`] boundary, emitting outbound messages through the
//! [`SignalingQueue`].

use tracing::{debug, info, warn};

use crate::codec::rewriter::rewrite_session_description;
use crate::codec::{CodecDescriptor, MediaKind};
use crate::media::{LocalMedia, MediaConstraints, MediaSource};
use crate::peer::endpoint::{MediaEndpoint, OfferOptions};
use crate::signaling::protocol::{IceCandidate, SignalingMessage};
use crate::signaling::queue::SignalingQueue;
use crate::{Error, Result};

/// Negotiation state of a peer session
///
/// `Idle → OfferPending → Stable → Closed`, with `Stable → OfferPending`
/// on renegotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// No descriptions exchanged yet
    Idle,
    /// Local offer sent, waiting for the remote answer
    OfferPending,
    /// Offer/answer exchange complete
    Stable,
    /// Session torn down; terminal
    Closed,
}

/// One negotiated connection to a single remote participant
pub struct PeerSession {
    peer_id: String,
    endpoint: Box<dyn MediaEndpoint>,
    local_media: Option<Box<dyn LocalMedia>>,
    local_description: Option<String>,
    remote_description: Option<String>,
    pending_candidates: Vec<IceCandidate>,
    state: NegotiationState,
    in_flight: bool,
    audio_codec: CodecDescriptor,
    video_codec: CodecDescriptor,
}

impl PeerSession {
    /// Create an idle session for `peer_id` with the codecs to pin.
    pub fn new(
        peer_id: String,
        endpoint: Box<dyn MediaEndpoint>,
        audio_codec: CodecDescriptor,
        video_codec: CodecDescriptor,
    ) -> Self {
        debug!("Creating peer session for {}", peer_id);
        Self {
            peer_id,
            endpoint,
            local_media: None,
            local_description: None,
            remote_description: None,
            pending_candidates: Vec::new(),
            state: NegotiationState::Idle,
            in_flight: false,
            audio_codec,
            video_codec,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn has_local_media(&self) -> bool {
        self.local_media.is_some()
    }

    pub fn local_description(&self) -> Option<&str> {
        self.local_description.as_deref()
    }

    pub fn remote_description(&self) -> Option<&str> {
        self.remote_description.as_deref()
    }

    /// Number of candidates buffered until a remote description exists.
    pub fn pending_candidate_count(&self) -> usize {
        self.pending_candidates.len()
    }

    /// Attach an acquired local stream to this session.
    ///
    /// The session owns the handle and stops it on close.
    pub async fn attach_local_media(&mut self, media: Box<dyn LocalMedia>) -> Result<()> {
        self.guard_open("attach_local_media")?;
        self.endpoint.attach_media(media.constraints()).await?;
        self.local_media = Some(media);
        Ok(())
    }

    /// Enable or disable local tracks of one kind, if media is attached.
    pub fn set_media_enabled(&mut self, kind: MediaKind, enabled: bool) {
        if let Some(media) = self.local_media.as_mut() {
            media.set_enabled(kind, enabled);
        }
    }

    /// Build, pin, install and emit an offer to this peer.
    ///
    /// Valid from `Idle` (initial negotiation) or `Stable`
    /// (renegotiation). Offer direction is derived from whether local
    /// media is attached: sessions without media request receive-only
    /// semantics.
    pub async fn create_offer(&mut self, queue: &mut SignalingQueue) -> Result<()> {
        match self.state {
            NegotiationState::Idle | NegotiationState::Stable => {}
            state => {
                return Err(Error::InvalidStateTransition {
                    operation: "create_offer",
                    state,
                })
            }
        }
        self.begin_negotiation()?;
        let result = self.create_offer_inner(queue).await;
        self.in_flight = false;
        result
    }

    async fn create_offer_inner(&mut self, queue: &mut SignalingQueue) -> Result<()> {
        let options = OfferOptions::for_local_media(self.local_media.is_some());
        let offer = self.endpoint.create_offer(options).await?;
        let pinned =
            rewrite_session_description(&offer, &self.audio_codec, &self.video_codec)?;
        self.endpoint.set_local_description(&pinned).await?;

        // The awaits above may have lost a race with close().
        self.guard_open("create_offer")?;
        self.local_description = Some(pinned.clone());
        self.state = NegotiationState::OfferPending;

        info!("Offer created for peer {}, awaiting answer", self.peer_id);
        // Offers bypass the ready gate; the answer is what opens it.
        queue.send_now(SignalingMessage::ReceiveVideoFrom {
            sender: self.peer_id.clone(),
            sdp_offer: pinned,
        })
    }

    /// Apply a remote offer and emit the pinned answer.
    ///
    /// Valid from `Idle`. Acquires local media through `source` when none
    /// is attached yet, then computes the answer, pins it, and moves the
    /// session to `Stable`.
    pub async fn apply_remote_offer(
        &mut self,
        sdp: &str,
        source: &dyn MediaSource,
        constraints: MediaConstraints,
        queue: &mut SignalingQueue,
    ) -> Result<()> {
        if self.state != NegotiationState::Idle {
            return Err(Error::InvalidStateTransition {
                operation: "apply_remote_offer",
                state: self.state,
            });
        }
        self.begin_negotiation()?;
        let result = self.apply_remote_offer_inner(sdp, source, constraints, queue).await;
        self.in_flight = false;
        result
    }

    async fn apply_remote_offer_inner(
        &mut self,
        sdp: &str,
        source: &dyn MediaSource,
        constraints: MediaConstraints,
        queue: &mut SignalingQueue,
    ) -> Result<()> {
        self.endpoint.set_remote_description(sdp).await?;
        self.remote_description = Some(sdp.to_string());

        if self.local_media.is_none() {
            let media = source.acquire(constraints).await?;
            self.endpoint.attach_media(media.constraints()).await?;
            self.local_media = Some(media);
        }

        let answer = self.endpoint.create_answer().await?;
        let pinned =
            rewrite_session_description(&answer, &self.audio_codec, &self.video_codec)?;
        self.endpoint.set_local_description(&pinned).await?;

        self.guard_open("apply_remote_offer")?;
        self.local_description = Some(pinned.clone());
        self.state = NegotiationState::Stable;

        info!("Answered remote offer from peer {}", self.peer_id);
        self.drain_pending_candidates().await?;

        queue.send_now(SignalingMessage::ReceiveVideoAnswer {
            name: self.peer_id.clone(),
            sdp_answer: pinned,
        })?;
        // Once our answer is out the peer can take candidates.
        queue.flush(&self.peer_id)
    }

    /// Apply the remote answer to a previously emitted offer.
    ///
    /// Valid only from `OfferPending`; duplicate or late answers fail
    /// with `InvalidStateTransition` and leave the session untouched.
    /// Buffered candidates are applied in arrival order once the remote
    /// description is installed.
    pub async fn apply_remote_answer(&mut self, sdp: &str) -> Result<()> {
        if self.state != NegotiationState::OfferPending {
            return Err(Error::InvalidStateTransition {
                operation: "apply_remote_answer",
                state: self.state,
            });
        }
        self.begin_negotiation()?;
        let result = self.apply_remote_answer_inner(sdp).await;
        self.in_flight = false;
        result
    }

    async fn apply_remote_answer_inner(&mut self, sdp: &str) -> Result<()> {
        self.endpoint.set_remote_description(sdp).await?;

        self.guard_open("apply_remote_answer")?;
        self.remote_description = Some(sdp.to_string());
        self.state = NegotiationState::Stable;

        info!("Answer applied for peer {}, session stable", self.peer_id);
        self.drain_pending_candidates().await
    }

    /// Apply a remote candidate, or buffer it until a remote description
    /// exists.
    pub async fn apply_remote_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        self.guard_open("apply_remote_candidate")?;

        if self.remote_description.is_some() {
            return self.endpoint.add_ice_candidate(&candidate).await;
        }

        debug!(
            "Buffering candidate for peer {} until remote description is set ({} pending)",
            self.peer_id,
            self.pending_candidates.len() + 1
        );
        self.pending_candidates.push(candidate);
        Ok(())
    }

    /// Tear the session down. Idempotent.
    ///
    /// Stops locally owned media, releases the endpoint, and moves to
    /// `Closed`; any negotiation step still resolving is discarded by the
    /// state guards rather than applied.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == NegotiationState::Closed {
            return Ok(());
        }

        info!("Closing peer session for {}", self.peer_id);
        if let Some(mut media) = self.local_media.take() {
            media.stop();
        }
        self.pending_candidates.clear();
        self.in_flight = false;
        self.state = NegotiationState::Closed;

        self.endpoint.close().await
    }

    /// Mark a negotiation step as in flight.
    ///
    /// The flag is cleared only when the step runs to completion; a step
    /// whose future is dropped mid-await leaves it set, so later steps
    /// fail with [`Error::NegotiationInProgress`] instead of interleaving
    /// with the abandoned exchange. `close` resets it.
    fn begin_negotiation(&mut self) -> Result<()> {
        if self.in_flight {
            return Err(Error::NegotiationInProgress(self.peer_id.clone()));
        }
        self.in_flight = true;
        Ok(())
    }

    fn guard_open(&self, operation: &'static str) -> Result<()> {
        if self.state == NegotiationState::Closed {
            return Err(Error::InvalidStateTransition {
                operation,
                state: NegotiationState::Closed,
            });
        }
        Ok(())
    }

    /// Apply every buffered candidate in arrival order, exactly once.
    ///
    /// All candidates are attempted even if one fails; the first failure
    /// is returned after the drain completes.
    async fn drain_pending_candidates(&mut self) -> Result<()> {
        if self.pending_candidates.is_empty() {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending_candidates);
        debug!(
            "Applying {} buffered candidates for peer {}",
            pending.len(),
            self.peer_id
        );

        let mut first_failure = None;
        for candidate in pending {
            if let Err(e) = self.endpoint.add_ice_candidate(&candidate).await {
                warn!("Buffered candidate rejected for peer {}: {}", self.peer_id, e);
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
