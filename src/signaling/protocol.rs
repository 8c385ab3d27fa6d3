//! Wire format of the signaling relay
//!
//! Room messages are JSON objects tagged by `cmd`, matching the relay's
//! protocol; every message except roster and error payloads carries
//! exactly one peer identifier used for routing. The single-peer direct
//! protocol (`{callee, content}` envelopes) and the HTTP polling variant
//! map onto the same message set.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// ICE candidate payload as exchanged over signaling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
}

/// Room-protocol signaling message, tagged by `cmd` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum SignalingMessage {
    /// Enter a room under a user name
    JoinRoom { room: String, user: String },
    /// SDP offer asking to receive the given peer's media
    ReceiveVideoFrom {
        sender: String,
        #[serde(rename = "sdpOffer")]
        sdp_offer: String,
    },
    /// SDP answer for a previously sent offer
    ReceiveVideoAnswer {
        name: String,
        #[serde(rename = "sdpAnswer")]
        sdp_answer: String,
    },
    /// Locally gathered candidate for the given peer
    OnIceCandidate {
        sender: String,
        candidate: IceCandidate,
    },
    /// Remote candidate relayed from the given peer
    IceCandidate {
        name: String,
        candidate: IceCandidate,
    },
    /// A new participant entered the room
    NewParticipantArrived { name: String },
    /// A participant left the room
    ParticipantLeaved { name: String },
    /// Roster snapshot of current room membership
    ExistingParticipants { data: Vec<String> },
    /// Leave the room entirely
    Leave,
    /// Tear down the connection to one peer without leaving the room;
    /// `sender` names the peer the hangup concerns (the recipient sees
    /// its own name)
    Hangup { sender: String },
}

impl SignalingMessage {
    /// The peer identifier this message is routed by, if it has one.
    pub fn routed_peer(&self) -> Option<&str> {
        match self {
            SignalingMessage::ReceiveVideoFrom { sender, .. }
            | SignalingMessage::OnIceCandidate { sender, .. }
            | SignalingMessage::Hangup { sender } => Some(sender),
            SignalingMessage::ReceiveVideoAnswer { name, .. }
            | SignalingMessage::IceCandidate { name, .. }
            | SignalingMessage::NewParticipantArrived { name }
            | SignalingMessage::ParticipantLeaved { name } => Some(name),
            SignalingMessage::JoinRoom { .. }
            | SignalingMessage::ExistingParticipants { .. }
            | SignalingMessage::Leave => None,
        }
    }
}

/// Error payload attached to an inbound relay message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayError {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

/// One inbound signaling frame after parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A well-formed room-protocol message
    Message(SignalingMessage),
    /// The relay reported an error; the room should be abandoned
    RelayError(RelayError),
}

/// Parse one inbound JSON frame.
///
/// Frames carrying an `error` field become [`Incoming::RelayError`];
/// frames without a `cmd` are ignored (`Ok(None)`), matching the relay's
/// tolerance for unknown traffic. Invalid JSON is a signaling error.
pub fn parse_incoming(text: &str) -> Result<Option<Incoming>> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| Error::Signaling(format!("invalid frame: {e}")))?;

    if let Some(err) = value.get("error") {
        let relay_error = match err {
            serde_json::Value::String(message) => RelayError {
                code: None,
                message: message.clone(),
            },
            other => serde_json::from_value(other.clone())
                .map_err(|e| Error::Signaling(format!("invalid error payload: {e}")))?,
        };
        return Ok(Some(Incoming::RelayError(relay_error)));
    }

    if value.get("cmd").is_none() {
        return Ok(None);
    }

    let message: SignalingMessage = serde_json::from_value(value)
        .map_err(|e| Error::Signaling(format!("invalid message: {e}")))?;
    Ok(Some(Incoming::Message(message)))
}

/// Session description or candidate payload of the direct protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectPayload {
    Description {
        #[serde(rename = "type")]
        kind: DescriptionKind,
        sdp: String,
    },
    Candidate(IceCandidate),
}

/// Direction of a direct-protocol session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionKind {
    Offer,
    Answer,
}

/// Envelope of the single-peer direct protocol
///
/// Outbound frames carry `callee`, inbound frames carry `from`; `content`
/// may be absent (end-of-candidates notifications arrive as null).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub content: Option<DirectPayload>,
}

impl DirectEnvelope {
    /// Map a direct-protocol frame onto the unified room message set.
    ///
    /// Returns `None` for frames without a payload or peer identifier.
    pub fn into_message(self) -> Option<SignalingMessage> {
        let peer = self.from.or(self.callee)?;
        Some(match self.content? {
            DirectPayload::Description {
                kind: DescriptionKind::Offer,
                sdp,
            } => SignalingMessage::ReceiveVideoFrom {
                sender: peer,
                sdp_offer: sdp,
            },
            DirectPayload::Description {
                kind: DescriptionKind::Answer,
                sdp,
            } => SignalingMessage::ReceiveVideoAnswer {
                name: peer,
                sdp_answer: sdp,
            },
            DirectPayload::Candidate(candidate) => SignalingMessage::IceCandidate {
                name: peer,
                candidate,
            },
        })
    }
}

/// One message drained from the HTTP polling endpoint (`GET /messages`)
///
/// `content` holds the JSON-encoded [`DirectPayload`], as stored by the
/// relay's `PUT /messages` handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub from: String,
    pub content: String,
}

impl PollMessage {
    /// Decode the stored payload and map it onto the room message set.
    pub fn into_message(self) -> Result<SignalingMessage> {
        let payload: DirectPayload = serde_json::from_str(&self.content)
            .map_err(|e| Error::Signaling(format!("invalid polled payload: {e}")))?;
        DirectEnvelope {
            callee: None,
            from: Some(self.from),
            content: Some(payload),
        }
        .into_message()
        .ok_or_else(|| Error::Signaling("polled message without payload".into()))
    }
}
