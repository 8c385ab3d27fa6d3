//! Core library for peer-to-peer audio/video calling over a signaling
//! relay.
//!
//! The crate coordinates call setup, not media: it sequences offers,
//! answers and ICE candidates against any number of simultaneous remote
//! peers, and deterministically rewrites session descriptions to pin one
//! audio and one video codec. The actual RTC engine and capture devices
//! sit behind the [`peer::MediaEndpoint`] and [`media::MediaSource`]
//! boundaries supplied by the embedding layer.
//!
//! A minimal room client:
//!
//! ```no_run
//! # async fn run(factory: Box<dyn meshcall::peer::EndpointFactory>,
//! #              source: Box<dyn meshcall::media::MediaSource>) -> meshcall::Result<()> {
//! use meshcall::{CallClient, CallConfig, WebSocketSignaling};
//!
//! let config = CallConfig::default().with_signaling_url("ws://relay:8080/ws");
//! let (mut client, mut events) =
//!     CallClient::connect("alice", config, &WebSocketSignaling, factory, source).await?;
//! client.join_room("demo")?;
//! tokio::spawn(async move { while let Some(event) = events.recv().await { println!("{event:?}"); } });
//! client.run().await
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;

pub use client::CallClient;
pub use codec::{catalog, CodecCatalog, CodecDescriptor, MediaKind};
pub use config::CallConfig;
pub use error::{Error, Result};
pub use events::CallEvent;
pub use media::{MediaConstraints, MediaSource};
pub use peer::{NegotiationState, PeerSession};
pub use session::SessionRegistry;
pub use signaling::{HttpPollSignaling, IceCandidate, SignalingMessage, WebSocketSignaling};
