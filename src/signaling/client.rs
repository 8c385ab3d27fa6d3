//! Signaling transports
//!
//! The client core talks to the relay through a pair of channels; a
//! [`SignalingConnector`] strategy establishes the actual transport and
//! spawns its pump tasks. Two strategies exist, mirroring the relay's two
//! entry points: a WebSocket connection and an HTTP long-poll loop over
//! `PUT`/`GET /messages`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, warn};

use super::protocol::{
    parse_incoming, DescriptionKind, DirectPayload, Incoming, PollMessage, SignalingMessage,
};
use crate::config::CallConfig;
use crate::{Error, Result};

/// Connected transport: one outbound sender, one inbound receiver
///
/// Dropping the outbound sender shuts the transport down; the inbound
/// receiver yields `None` once the relay side is gone.
pub struct SignalingChannel {
    pub outbound: mpsc::UnboundedSender<SignalingMessage>,
    pub inbound: mpsc::UnboundedReceiver<Incoming>,
}

/// Strategy for reaching the signaling relay
#[async_trait]
pub trait SignalingConnector: Send + Sync {
    async fn connect(&self, user: &str, config: &CallConfig) -> Result<SignalingChannel>;
}

/// WebSocket transport against the relay's `/ws` endpoint
pub struct WebSocketSignaling;

#[async_trait]
impl SignalingConnector for WebSocketSignaling {
    async fn connect(&self, _user: &str, config: &CallConfig) -> Result<SignalingChannel> {
        let (ws, _response) = connect_async(config.signaling_url.as_str())
            .await
            .map_err(|e| Error::Signaling(format!("websocket connect failed: {e}")))?;
        debug!("WebSocket connected to {}", config.signaling_url);

        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SignalingMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Incoming>();

        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode outbound message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    error!("WebSocket send failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match parse_incoming(&text) {
                        Ok(Some(incoming)) => {
                            if in_tx.send(incoming).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!("Discarding malformed frame: {}", e),
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket receive failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(SignalingChannel {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// HTTP transport polling the relay's message store
///
/// Outbound messages become `PUT /messages` bodies in the direct
/// protocol, with the destination peer as the `callee` query value (the
/// relay keys stored messages by it); inbound messages are drained with
/// `GET /messages` on a fixed interval. Only description and candidate
/// messages exist in this protocol; room commands are rejected by the
/// sender task.
pub struct HttpPollSignaling {
    pub poll_interval: Duration,
}

impl Default for HttpPollSignaling {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[async_trait]
impl SignalingConnector for HttpPollSignaling {
    async fn connect(&self, user: &str, config: &CallConfig) -> Result<SignalingChannel> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Signaling(format!("http client init failed: {e}")))?;
        let base = config.signaling_url.trim_end_matches('/').to_string();
        let user = user.to_string();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SignalingMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Incoming>();

        let put_client = client.clone();
        let put_url = format!("{base}/messages");
        let from = user.clone();
        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                let Some((kind, callee, payload)) = direct_frame(message) else {
                    warn!("Message has no direct-protocol form, dropping");
                    continue;
                };
                let content = match serde_json::to_string(&payload) {
                    Ok(content) => content,
                    Err(e) => {
                        error!("Failed to encode outbound payload: {}", e);
                        continue;
                    }
                };
                let body = PollMessage {
                    kind: kind.to_string(),
                    from: from.clone(),
                    content,
                };
                if let Err(e) = put_client
                    .put(&put_url)
                    .query(&[("callee", callee.as_str())])
                    .json(&body)
                    .send()
                    .await
                {
                    error!("Message store put failed: {}", e);
                    break;
                }
            }
        });

        let get_url = format!("{base}/messages");
        let interval = self.poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if in_tx.is_closed() {
                    break;
                }
                let response = match client
                    .get(&get_url)
                    .query(&[("user", user.as_str())])
                    .send()
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        warn!("Message store poll failed: {}", e);
                        continue;
                    }
                };
                let messages: Vec<PollMessage> = match response.json().await {
                    Ok(messages) => messages,
                    Err(e) => {
                        warn!("Invalid message store response: {}", e);
                        continue;
                    }
                };
                for polled in messages {
                    match polled.into_message() {
                        Ok(message) => {
                            if in_tx.send(Incoming::Message(message)).is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("Discarding polled message: {}", e),
                    }
                }
            }
        });

        Ok(SignalingChannel {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// Map a room message onto the direct protocol's `(type, callee, payload)`
/// triple; `callee` is the destination peer the relay routes by.
///
/// Room management commands have no direct-protocol form.
fn direct_frame(message: SignalingMessage) -> Option<(&'static str, String, DirectPayload)> {
    match message {
        SignalingMessage::ReceiveVideoFrom { sender, sdp_offer } => Some((
            "offer",
            sender,
            DirectPayload::Description {
                kind: DescriptionKind::Offer,
                sdp: sdp_offer,
            },
        )),
        SignalingMessage::ReceiveVideoAnswer { name, sdp_answer } => Some((
            "answer",
            name,
            DirectPayload::Description {
                kind: DescriptionKind::Answer,
                sdp: sdp_answer,
            },
        )),
        SignalingMessage::OnIceCandidate {
            sender: peer,
            candidate,
        }
        | SignalingMessage::IceCandidate {
            name: peer,
            candidate,
        } => Some(("candidate", peer, DirectPayload::Candidate(candidate))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::protocol::IceCandidate;

    #[test]
    fn offers_map_to_direct_descriptions() {
        let (kind, callee, payload) = direct_frame(SignalingMessage::ReceiveVideoFrom {
            sender: "bob".into(),
            sdp_offer: "v=0".into(),
        })
        .unwrap();
        assert_eq!(kind, "offer");
        assert_eq!(callee, "bob");
        assert!(matches!(
            payload,
            DirectPayload::Description {
                kind: DescriptionKind::Offer,
                ..
            }
        ));
    }

    #[test]
    fn candidates_map_to_direct_candidates() {
        let candidate = IceCandidate {
            candidate: "candidate:1".into(),
            sdp_mid: Some("0".into()),
            sdp_mline_index: Some(0),
        };
        let (kind, callee, payload) = direct_frame(SignalingMessage::OnIceCandidate {
            sender: "bob".into(),
            candidate: candidate.clone(),
        })
        .unwrap();
        assert_eq!(kind, "candidate");
        assert_eq!(callee, "bob");
        assert_eq!(payload, DirectPayload::Candidate(candidate));
    }

    #[test]
    fn every_direct_frame_names_its_destination() {
        // The relay keys stored messages by callee; a frame that loses
        // the destination is undeliverable.
        let frames = [
            SignalingMessage::ReceiveVideoFrom {
                sender: "bob".into(),
                sdp_offer: "v=0".into(),
            },
            SignalingMessage::ReceiveVideoAnswer {
                name: "bob".into(),
                sdp_answer: "v=0".into(),
            },
            SignalingMessage::IceCandidate {
                name: "bob".into(),
                candidate: IceCandidate {
                    candidate: "candidate:1".into(),
                    sdp_mid: None,
                    sdp_mline_index: None,
                },
            },
        ];
        for frame in frames {
            let (_, callee, _) = direct_frame(frame).unwrap();
            assert_eq!(callee, "bob");
        }
    }

    #[test]
    fn room_commands_have_no_direct_form() {
        assert!(direct_frame(SignalingMessage::Leave).is_none());
        assert!(direct_frame(SignalingMessage::JoinRoom {
            room: "demo".into(),
            user: "alice".into(),
        })
        .is_none());
    }
}
