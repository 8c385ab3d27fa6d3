//! Session-description rewriting for codec pinning
//!
//! Pure text transform: scans the description line by line and replaces
//! the codec-selection lines of each audio/video section with a single
//! announcement for the chosen codec. Section order and unrelated lines
//! pass through untouched.

use tracing::debug;

use super::{CodecDescriptor, MediaKind};
use crate::{Error, Result};

/// Rewrite a session description to pin one audio and one video codec.
///
/// The `m=` payload-type list of each audio/video section is replaced by
/// the chosen codec's payload type, and the first codec-attribute line
/// (`a=rtpmap`/`a=rtcp-fb`/`a=fmtp`) of the section is replaced by a full
/// announcement block for that codec; the remaining original codec
/// attributes are dropped, since they describe codecs being removed.
///
/// Known gap, kept for wire compatibility with the deployed clients: a
/// media section that contains no codec-attribute lines at all gets its
/// `m=` line rewritten but no replacement block, leaving the section
/// without an rtpmap for the pinned payload type.
pub fn rewrite_session_description(
    sdp: &str,
    audio: &CodecDescriptor,
    video: &CodecDescriptor,
) -> Result<String> {
    let ending = if sdp.contains("\r\n") { "\r\n" } else { "\n" };
    let mut out = String::with_capacity(sdp.len());
    let mut cursor: Option<MediaKind> = None;

    for raw in sdp.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() {
            continue;
        }

        if line.starts_with("m=") {
            // Section boundary: an unconsumed cursor from a section with
            // no codec attributes is abandoned here.
            cursor = None;

            if line.starts_with("m=audio ") {
                push_media_line(&mut out, line, audio.payload_type, ending)?;
                cursor = Some(MediaKind::Audio);
                continue;
            }
            if line.starts_with("m=video ") {
                push_media_line(&mut out, line, video.payload_type, ending)?;
                cursor = Some(MediaKind::Video);
                continue;
            }

            out.push_str(line);
            out.push_str(ending);
            continue;
        }

        if line.starts_with("a=rtpmap:") || line.starts_with("a=rtcp-fb:") || line.starts_with("a=fmtp:")
        {
            match cursor.take() {
                Some(MediaKind::Audio) => push_codec_block(&mut out, audio, ending),
                Some(MediaKind::Video) => push_codec_block(&mut out, video, ending),
                None => {}
            }
            continue;
        }

        // Belongs to a codec being replaced; the block above re-emits it
        // when the chosen codec defines one.
        if line.starts_with("a=framesize:") {
            continue;
        }

        out.push_str(line);
        out.push_str(ending);
    }

    debug!(
        "Rewrote session description pinning {} / {} ({} bytes)",
        audio.name,
        video.name,
        out.len()
    );

    Ok(out)
}

/// Rewrite an `m=` line header, keeping media/port/proto and replacing the
/// payload-type list with the single chosen payload type.
fn push_media_line(out: &mut String, line: &str, payload_type: u8, ending: &str) -> Result<()> {
    let mut fields = line.split_whitespace();
    let (media, port, proto) = match (fields.next(), fields.next(), fields.next()) {
        (Some(m), Some(p), Some(pr)) => (m, p, pr),
        _ => {
            return Err(Error::MalformedDescription(format!(
                "media line has fewer than three fields: {line:?}"
            )))
        }
    };

    out.push_str(media);
    out.push(' ');
    out.push_str(port);
    out.push(' ');
    out.push_str(proto);
    out.push(' ');
    out.push_str(&payload_type.to_string());
    out.push_str(ending);
    Ok(())
}

/// Emit the full announcement block for one codec.
fn push_codec_block(out: &mut String, codec: &CodecDescriptor, ending: &str) {
    let pt = codec.payload_type;

    out.push_str(&format!("a=rtpmap:{pt} {}", codec.name));
    out.push_str(ending);

    for fb in codec.feedback {
        out.push_str(&format!("a=rtcp-fb:{pt} {fb}"));
        out.push_str(ending);
    }

    if let Some(params) = codec.format_params {
        out.push_str(&format!("a=fmtp:{pt} {params}"));
        out.push_str(ending);
    }

    if let Some(size) = codec.frame_size {
        out.push_str(&format!("a=framesize:{pt} {size}"));
        out.push_str(ending);
    }
}
