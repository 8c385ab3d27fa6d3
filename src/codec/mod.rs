//! Codec catalog and session-description rewriting
//!
//! The catalog is a process-wide, read-only registry of the codecs the
//! clients know how to pin. Descriptors carry everything the rewriter
//! needs to announce a codec: payload type, rtpmap name, feedback
//! attributes, and optional format parameters.

pub mod rewriter;

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Media kind a codec or media section belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio media section (`m=audio`)
    Audio,
    /// Video media section (`m=video`)
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Immutable description of a single codec
///
/// `name` is the full rtpmap encoding name including clock rate (and
/// channel count for audio), e.g. `"VP8/90000"` or `"opus/48000/2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecDescriptor {
    /// RTP payload type announced in the `m=` line
    pub payload_type: u8,
    /// rtpmap encoding name with clock rate
    pub name: &'static str,
    /// `a=rtcp-fb` attribute values, in announcement order
    pub feedback: &'static [&'static str],
    /// `a=fmtp` format parameters, if any
    pub format_params: Option<&'static str>,
    /// `a=framesize` value, if any
    pub frame_size: Option<&'static str>,
}

const VIDEO_FEEDBACK: &[&str] = &["ccm fir", "nack", "nack pli", "goog-remb", "transport-cc"];

const VIDEO_CODECS: &[(&str, CodecDescriptor)] = &[
    (
        "vp8",
        CodecDescriptor {
            payload_type: 100,
            name: "VP8/90000",
            feedback: VIDEO_FEEDBACK,
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "vp9",
        CodecDescriptor {
            payload_type: 101,
            name: "VP9/90000",
            feedback: VIDEO_FEEDBACK,
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "h264",
        CodecDescriptor {
            payload_type: 107,
            name: "H264/90000",
            feedback: VIDEO_FEEDBACK,
            format_params: Some("level-asymmetry-allowed=1;packetization-mode=1"),
            frame_size: None,
        },
    ),
    (
        "red",
        CodecDescriptor {
            payload_type: 116,
            name: "red/90000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "ulpfec",
        CodecDescriptor {
            payload_type: 117,
            name: "ulpfec/90000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "rtx",
        CodecDescriptor {
            payload_type: 96,
            name: "rtx/90000",
            feedback: &[],
            format_params: Some("apt=100"),
            frame_size: None,
        },
    ),
];

const AUDIO_CODECS: &[(&str, CodecDescriptor)] = &[
    (
        "opus",
        CodecDescriptor {
            payload_type: 111,
            name: "opus/48000/2",
            feedback: &["transport-cc"],
            format_params: Some("minptime=10;useinbandfec=1"),
            frame_size: None,
        },
    ),
    (
        "g722",
        CodecDescriptor {
            payload_type: 9,
            name: "G722/8000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "pcmu",
        CodecDescriptor {
            payload_type: 0,
            name: "PCMU/8000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "pcma",
        CodecDescriptor {
            payload_type: 8,
            name: "PCMA/8000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "isac16",
        CodecDescriptor {
            payload_type: 103,
            name: "ISAC/16000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "isac32",
        CodecDescriptor {
            payload_type: 104,
            name: "ISAC/32000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "cn32",
        CodecDescriptor {
            payload_type: 106,
            name: "CN/32000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "cn16",
        CodecDescriptor {
            payload_type: 105,
            name: "CN/16000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
    (
        "cn8",
        CodecDescriptor {
            payload_type: 13,
            name: "CN/8000",
            feedback: &[],
            format_params: None,
            frame_size: None,
        },
    ),
];

/// Registry of supported codecs, one table per media kind
///
/// Built once at startup and shared read-only; payload types are unique
/// within each table.
pub struct CodecCatalog {
    audio: HashMap<&'static str, CodecDescriptor>,
    video: HashMap<&'static str, CodecDescriptor>,
}

impl CodecCatalog {
    fn builtin() -> Self {
        let audio: HashMap<_, _> = AUDIO_CODECS.iter().copied().collect();
        let video: HashMap<_, _> = VIDEO_CODECS.iter().copied().collect();

        debug_assert!(unique_payload_types(&audio), "duplicate audio payload type");
        debug_assert!(unique_payload_types(&video), "duplicate video payload type");

        Self { audio, video }
    }

    /// Look up a codec descriptor by media kind and short name
    pub fn lookup(&self, kind: MediaKind, short_name: &str) -> Result<&CodecDescriptor> {
        let table = match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        };
        table.get(short_name).ok_or_else(|| Error::UnknownCodec {
            kind,
            name: short_name.to_string(),
        })
    }

    /// Short names registered for a media kind, unordered
    pub fn short_names(&self, kind: MediaKind) -> Vec<&'static str> {
        match kind {
            MediaKind::Audio => self.audio.keys().copied().collect(),
            MediaKind::Video => self.video.keys().copied().collect(),
        }
    }
}

fn unique_payload_types(table: &HashMap<&'static str, CodecDescriptor>) -> bool {
    let mut seen = std::collections::HashSet::new();
    table.values().all(|c| seen.insert(c.payload_type))
}

/// Process-wide codec catalog
pub fn catalog() -> &'static CodecCatalog {
    static CATALOG: OnceLock<CodecCatalog> = OnceLock::new();
    CATALOG.get_or_init(CodecCatalog::builtin)
}
