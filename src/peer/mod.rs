//! Peer connection management

pub mod endpoint;
pub mod session;

pub use endpoint::{EndpointFactory, MediaEndpoint, OfferDirection, OfferOptions};
pub use session::{NegotiationState, PeerSession};
