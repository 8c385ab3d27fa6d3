//! Local media boundary
//!
//! The core never touches capture devices itself; the embedding layer
//! provides a [`MediaSource`] and hands back opaque stream handles the
//! sessions own for their lifetime.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::codec::MediaKind;
use crate::Result;

/// Which local tracks to request from the media source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

/// Provider of local capture streams (camera/microphone)
///
/// Fails with [`crate::Error::MediaAcquisition`] on permission denial or
/// device unavailability.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Acquire a local stream satisfying `constraints`.
    async fn acquire(&self, constraints: MediaConstraints) -> Result<Box<dyn LocalMedia>>;
}

/// Handle to an acquired local stream
///
/// Owned by the session that attached it; `stop` releases the underlying
/// tracks and is called on session close.
pub trait LocalMedia: Send {
    /// Constraints the stream was acquired with
    fn constraints(&self) -> MediaConstraints;

    /// Enable or disable the tracks of one kind without renegotiating
    fn set_enabled(&mut self, kind: MediaKind, enabled: bool);

    /// Stop and release all tracks; further calls are no-ops
    fn stop(&mut self);
}
