//! A scripted in-memory transport for tests.
//!
//! `ScriptedTransport` records every request it sees, stamped with the
//! Tokio clock, and answers from per-endpoint reply queues. With
//! `#[tokio::test(start_paused = true)]` the timestamps are exact, so
//! tests can assert heartbeat intervals and backoff delays directly.
//!
//! ```ignore
//! let transport = Arc::new(ScriptedTransport::new());
//! transport.push(Endpoint::SettleSlip, Reply::Status(404));
//! let client = Client::from_arc(Arc::clone(&transport), RetryConfig::default());
//! // ... exercise code ...
//! assert_eq!(transport.count(Endpoint::SettleSlip), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use arcade_protocol::{
    ActivateSlipResponse, Codec, Endpoint, JsonCodec, ServerStatus,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::{self, Instant};

use crate::{ApiRequest, RawResponse, Transport, TransportError};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Empty body with this status.
    Status(u16),
    /// This status and raw body.
    Body(u16, Vec<u8>),
    /// The attempt fails before any response arrives.
    NetworkFailure,
    /// The transport can't send at all.
    Unavailable,
    /// Wait, then answer. Models a request still in flight.
    Slow(Duration, Box<Reply>),
}

impl Reply {
    /// A JSON body with the given status.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = JsonCodec
            .encode(value)
            .expect("test reply must serialize");
        Self::Body(status, body)
    }

    pub fn slow(delay: Duration, reply: Reply) -> Self {
        Self::Slow(delay, Box::new(reply))
    }
}

/// A request as the transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: ApiRequest,
    /// Tokio time at which the attempt started.
    pub at: Instant,
}

impl RecordedRequest {
    /// Decodes the request body, if it has one.
    pub fn body_json<T: DeserializeOwned>(&self) -> Option<T> {
        let body = self.request.body.as_ref()?;
        JsonCodec.decode(body).ok()
    }
}

#[derive(Default)]
struct Script {
    log: Vec<RecordedRequest>,
    replies: HashMap<Endpoint, VecDeque<Reply>>,
}

/// Records requests and replays scripted replies.
///
/// When an endpoint's queue is empty the reply is `200` with a body
/// that decodes as the endpoint's response type (`ServerStatus` for the
/// status probe, `ActivateSlipResponse` for activation, empty otherwise).
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("scripted transport lock poisoned")
    }

    /// Queues a reply for the next request to `endpoint`.
    pub fn push(&self, endpoint: Endpoint, reply: Reply) -> &Self {
        self.script()
            .replies
            .entry(endpoint)
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script().log.clone()
    }

    /// Requests to one endpoint, in order.
    pub fn requests_to(&self, endpoint: Endpoint) -> Vec<RecordedRequest> {
        self.script()
            .log
            .iter()
            .filter(|r| r.request.endpoint == endpoint)
            .cloned()
            .collect()
    }

    /// Number of requests to one endpoint.
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.script()
            .log
            .iter()
            .filter(|r| r.request.endpoint == endpoint)
            .count()
    }

    /// Forgets every recorded request. Queued replies are kept.
    pub fn clear_log(&self) {
        self.script().log.clear();
    }

    fn default_reply(endpoint: Endpoint) -> Reply {
        match endpoint {
            Endpoint::ServerStatus => Reply::json(
                200,
                &ServerStatus {
                    random_seed: "scripted-seed".into(),
                },
            ),
            Endpoint::ActivateSlip => Reply::json(
                200,
                &ActivateSlipResponse {
                    display_name: "Scripted Player".into(),
                    player_id: Some("scripted-1".into()),
                },
            ),
            _ => Reply::Status(200),
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let mut reply = {
            let mut script = self.script();
            script.log.push(RecordedRequest {
                request: request.clone(),
                at: Instant::now(),
            });
            script
                .replies
                .get_mut(&request.endpoint)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Self::default_reply(request.endpoint))
        };

        while let Reply::Slow(delay, inner) = reply {
            time::sleep(delay).await;
            reply = *inner;
        }

        match reply {
            Reply::Status(status) => Ok(RawResponse::status(status)),
            Reply::Body(status, body) => Ok(RawResponse::status(status).with_body(body)),
            Reply::NetworkFailure => Err(TransportError::Network("scripted network failure".into())),
            Reply::Unavailable => Err(TransportError::Unavailable("scripted unavailable".into())),
            Reply::Slow(..) => unreachable!("unwrapped above"),
        }
    }
}
