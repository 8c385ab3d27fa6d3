//! Real-time media endpoint boundary
//!
//! The core drives negotiation against this trait; the embedding layer
//! implements it on top of its actual RTC engine. Test suites implement
//! it with scripted mocks.

use async_trait::async_trait;

use crate::media::MediaConstraints;
use crate::signaling::protocol::IceCandidate;
use crate::Result;

/// Media direction an offer requests
///
/// A session that already has local media to send offers bidirectional
/// media; a session without local media must explicitly ask to receive.
/// The asymmetry is an explicit flag so callers never infer it from
/// ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferDirection {
    /// Send local tracks and receive remote ones
    SendRecv,
    /// No local tracks; request remote media only
    RecvOnly,
}

/// Options passed to [`MediaEndpoint::create_offer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferOptions {
    pub direction: OfferDirection,
    pub voice_activity_detection: bool,
    pub ice_restart: bool,
}

impl OfferOptions {
    /// Offer configuration for a session with or without local media.
    ///
    /// A session without local media maps to `RecvOnly`: it always wants
    /// the remote tracks and never advertises send lines it cannot
    /// honor. Browser engines express the same intent as a
    /// receive-preferring offer constraint.
    pub fn for_local_media(has_local_media: bool) -> Self {
        Self {
            direction: if has_local_media {
                OfferDirection::SendRecv
            } else {
                OfferDirection::RecvOnly
            },
            voice_activity_detection: true,
            ice_restart: false,
        }
    }
}

/// One peer connection of the underlying real-time transport
#[async_trait]
pub trait MediaEndpoint: Send {
    /// Build an offer description with the given options.
    async fn create_offer(&mut self, options: OfferOptions) -> Result<String>;

    /// Build an answer for the current remote description.
    async fn create_answer(&mut self) -> Result<String>;

    /// Install the local description (possibly rewritten).
    async fn set_local_description(&mut self, sdp: &str) -> Result<()>;

    /// Install the remote description.
    async fn set_remote_description(&mut self, sdp: &str) -> Result<()>;

    /// Apply one remote ICE candidate.
    async fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<()>;

    /// Attach local capture tracks matching `constraints`.
    async fn attach_media(&mut self, constraints: MediaConstraints) -> Result<()>;

    /// Release the underlying transport resource; must be idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for endpoints, one per remote peer
///
/// The registry calls this on first contact with a peer; the
/// implementation typically reads ICE server configuration from
/// [`crate::config::CallConfig`].
pub trait EndpointFactory: Send {
    fn create(&self, peer_id: &str) -> Result<Box<dyn MediaEndpoint>>;
}
