//! Client configuration

use serde::{Deserialize, Serialize};

use crate::media::MediaConstraints;

/// Configuration for a call client
///
/// `audio_codec` and `video_codec` are short names resolved against the
/// codec catalog when the registry is built; unknown names fail at
/// construction rather than mid-call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// Signaling relay endpoint (WebSocket URL or HTTP base URL)
    pub signaling_url: String,
    /// STUN/TURN server URLs handed to the endpoint factory
    pub ice_servers: Vec<String>,
    /// Audio codec to pin in every description
    pub audio_codec: String,
    /// Video codec to pin in every description
    pub video_codec: String,
    /// Local capture tracks to request
    #[serde(default)]
    pub constraints: MediaConstraints,
    /// Offer to every newly arrived participant automatically
    pub auto_call: bool,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://127.0.0.1:8080/ws".to_string(),
            ice_servers: vec![
                "stun:stun2.l.google.com:19302".to_string(),
                "stun:stun.ekiga.net".to_string(),
            ],
            audio_codec: "opus".to_string(),
            video_codec: "vp8".to_string(),
            constraints: MediaConstraints::default(),
            auto_call: true,
        }
    }
}

impl CallConfig {
    pub fn with_signaling_url(mut self, url: impl Into<String>) -> Self {
        self.signaling_url = url.into();
        self
    }

    pub fn with_codecs(mut self, audio: impl Into<String>, video: impl Into<String>) -> Self {
        self.audio_codec = audio.into();
        self.video_codec = video.into();
        self
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_auto_call(mut self, auto_call: bool) -> Self {
        self.auto_call = auto_call;
        self
    }
}
