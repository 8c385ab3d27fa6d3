//! Shared mocks for driving the call core without a real RTC engine.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use meshcall::events::EventSink;
use meshcall::media::{LocalMedia, MediaConstraints, MediaSource};
use meshcall::peer::{EndpointFactory, MediaEndpoint, OfferOptions};
use meshcall::signaling::{IceCandidate, SignalingMessage};
use meshcall::{CallConfig, CallEvent, Error, MediaKind, Result, SessionRegistry};

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One recorded endpoint invocation, tagged with the owning peer id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointCall {
    CreateOffer(OfferOptions),
    CreateAnswer,
    SetLocal(String),
    SetRemote(String),
    AddCandidate(String),
    AttachMedia(MediaConstraints),
    Close,
}

/// Call log shared between a test and every mock endpoint it spawns.
#[derive(Clone, Default)]
pub struct EndpointLog {
    calls: Arc<Mutex<Vec<(String, EndpointCall)>>>,
    reject_candidates: Arc<Mutex<bool>>,
    stall_offers: Arc<Mutex<bool>>,
}

impl EndpointLog {
    pub fn calls(&self) -> Vec<(String, EndpointCall)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, peer_id: &str) -> Vec<EndpointCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == peer_id)
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn candidates_for(&self, peer_id: &str) -> Vec<String> {
        self.calls_for(peer_id)
            .into_iter()
            .filter_map(|call| match call {
                EndpointCall::AddCandidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Make every `add_ice_candidate` fail until reset.
    pub fn set_reject_candidates(&self, reject: bool) {
        *self.reject_candidates.lock().unwrap() = reject;
    }

    /// Make `create_offer` hang forever until reset.
    pub fn set_stall_offers(&self, stall: bool) {
        *self.stall_offers.lock().unwrap() = stall;
    }

    fn push(&self, peer_id: &str, call: EndpointCall) {
        self.calls.lock().unwrap().push((peer_id.to_string(), call));
    }
}

pub struct MockEndpoint {
    peer_id: String,
    log: EndpointLog,
    offer_sdp: String,
    answer_sdp: String,
}

impl MockEndpoint {
    pub fn new(peer_id: &str, log: EndpointLog) -> Self {
        Self {
            peer_id: peer_id.to_string(),
            log,
            offer_sdp: sample_offer(),
            answer_sdp: sample_answer(),
        }
    }
}

#[async_trait]
impl MediaEndpoint for MockEndpoint {
    async fn create_offer(&mut self, options: OfferOptions) -> Result<String> {
        self.log.push(&self.peer_id, EndpointCall::CreateOffer(options));
        if *self.log.stall_offers.lock().unwrap() {
            std::future::pending::<()>().await;
        }
        Ok(self.offer_sdp.clone())
    }

    async fn create_answer(&mut self) -> Result<String> {
        self.log.push(&self.peer_id, EndpointCall::CreateAnswer);
        Ok(self.answer_sdp.clone())
    }

    async fn set_local_description(&mut self, sdp: &str) -> Result<()> {
        self.log
            .push(&self.peer_id, EndpointCall::SetLocal(sdp.to_string()));
        Ok(())
    }

    async fn set_remote_description(&mut self, sdp: &str) -> Result<()> {
        self.log
            .push(&self.peer_id, EndpointCall::SetRemote(sdp.to_string()));
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<()> {
        self.log.push(
            &self.peer_id,
            EndpointCall::AddCandidate(candidate.candidate.clone()),
        );
        if *self.log.reject_candidates.lock().unwrap() {
            return Err(Error::Endpoint("candidate rejected".into()));
        }
        Ok(())
    }

    async fn attach_media(&mut self, constraints: MediaConstraints) -> Result<()> {
        self.log
            .push(&self.peer_id, EndpointCall::AttachMedia(constraints));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.push(&self.peer_id, EndpointCall::Close);
        Ok(())
    }
}

pub struct MockFactory {
    pub log: EndpointLog,
}

impl EndpointFactory for MockFactory {
    fn create(&self, peer_id: &str) -> Result<Box<dyn MediaEndpoint>> {
        Ok(Box::new(MockEndpoint::new(peer_id, self.log.clone())))
    }
}

#[derive(Clone, Default)]
pub struct MockMediaSource {
    pub acquired: Arc<Mutex<u32>>,
    pub stopped: Arc<Mutex<u32>>,
    pub toggles: Arc<Mutex<Vec<(MediaKind, bool)>>>,
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<Box<dyn LocalMedia>> {
        *self.acquired.lock().unwrap() += 1;
        Ok(Box::new(MockLocalMedia {
            constraints,
            stopped: self.stopped.clone(),
            toggles: self.toggles.clone(),
        }))
    }
}

pub struct MockLocalMedia {
    constraints: MediaConstraints,
    stopped: Arc<Mutex<u32>>,
    toggles: Arc<Mutex<Vec<(MediaKind, bool)>>>,
}

impl LocalMedia for MockLocalMedia {
    fn constraints(&self) -> MediaConstraints {
        self.constraints
    }

    fn set_enabled(&mut self, kind: MediaKind, enabled: bool) {
        self.toggles.lock().unwrap().push((kind, enabled));
    }

    fn stop(&mut self) {
        *self.stopped.lock().unwrap() += 1;
    }
}

/// Offer text the mock endpoint produces, shaped like real browser SDP.
pub fn sample_offer() -> String {
    [
        "v=0",
        "o=- 4611731400430051336 2 IN IP4 127.0.0.1",
        "s=-",
        "t=0 0",
        "a=group:BUNDLE 0 1",
        "m=audio 9 UDP/TLS/RTP/SAVPF 111 103 9 0 8",
        "c=IN IP4 0.0.0.0",
        "a=mid:0",
        "a=rtpmap:111 opus/48000/2",
        "a=rtcp-fb:111 transport-cc",
        "a=fmtp:111 minptime=10;useinbandfec=1",
        "a=rtpmap:103 ISAC/16000",
        "m=video 9 UDP/TLS/RTP/SAVPF 96 100 101 107",
        "c=IN IP4 0.0.0.0",
        "a=mid:1",
        "a=rtpmap:100 VP8/90000",
        "a=rtcp-fb:100 nack",
        "a=rtpmap:101 VP9/90000",
        "",
    ]
    .join("\n")
}

pub fn sample_answer() -> String {
    sample_offer()
}

pub fn candidate(n: u32) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{n} 1 udp 2122260223 192.168.1.2 5400{n} typ host"),
        sdp_mid: Some("0".into()),
        sdp_mline_index: Some(0),
    }
}

/// A registry wired to mocks, with its outbound and event receivers.
pub struct TestCall {
    pub registry: SessionRegistry,
    pub outbound: mpsc::UnboundedReceiver<SignalingMessage>,
    pub events: mpsc::UnboundedReceiver<CallEvent>,
    pub log: EndpointLog,
    pub media: MockMediaSource,
}

impl TestCall {
    pub fn new(user: &str, config: CallConfig) -> Self {
        init_tracing();
        let log = EndpointLog::default();
        let media = MockMediaSource::default();
        let (events_tx, events) = EventSink::channel();
        let (outbound_tx, outbound) = mpsc::unbounded_channel();
        let registry = SessionRegistry::new(
            user,
            config,
            Box::new(MockFactory { log: log.clone() }),
            Box::new(media.clone()),
            outbound_tx,
            events_tx,
        )
        .unwrap();
        Self {
            registry,
            outbound,
            events,
            log,
            media,
        }
    }

    pub fn drain_outbound(&mut self) -> Vec<SignalingMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            messages.push(message);
        }
        messages
    }

    pub fn drain_events(&mut self) -> Vec<CallEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
