//! Transport layer for the Arcade SDK.
//!
//! Two levels live here:
//!
//! - [`Transport`] — ONE attempt at one HTTP exchange. Implementations
//!   only move bytes: [`HttpTransport`] talks to a real hypervisor, the
//!   SDK's offline stand-in answers from a table, and `ScriptedTransport`
//!   (feature `test-util`) replays whatever a test tells it to.
//! - [`Client`] — ONE logical call. It wraps a transport with the
//!   [`RetryPolicy`] chosen for the endpoint, classifies every response,
//!   and turns the result into a payload or an [`ApiError`].
//!
//! # Feature Flags
//!
//! - `http` (default) — [`HttpTransport`] via `reqwest`
//! - `test-util` — `ScriptedTransport` for tests in downstream crates

mod client;
mod error;
#[cfg(feature = "http")]
mod http;
mod retry;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::Client;
pub use error::{ApiError, TransportError};
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use retry::{Outcome, RetryConfig, RetryPolicy, classify};

use std::future::Future;
use std::sync::Arc;

use arcade_protocol::{Endpoint, PoolId, SlipToken};

/// A request as handed to a [`Transport`].
///
/// The body is already encoded; transports never see typed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub bearer: Option<SlipToken>,
    /// Sent as the `pool_id` query parameter when present.
    pub pool_id: Option<String>,
    /// Encoded JSON body.
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// A bare request with no credential, pool, or body.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            bearer: None,
            pool_id: None,
            body: None,
        }
    }

    pub fn bearer(mut self, token: &SlipToken) -> Self {
        self.bearer = Some(token.clone());
        self
    }

    /// Tags a pool call with its pool. [`PoolId::Implicit`] adds
    /// nothing, and neither does any endpoint that isn't a pool call.
    pub fn pool(mut self, pool: &PoolId) -> Self {
        self.pool_id = pool
            .as_query()
            .filter(|_| self.endpoint.is_pool_call())
            .map(str::to_owned);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// What came back from one attempt, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Status reason phrase, e.g. `"Not Found"`.
    pub reason: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// A response with an empty body and the canonical reason for `status`.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            reason: reason_phrase(status).to_owned(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// The body as text, for error messages.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs one attempt at one HTTP exchange.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → the transport is shared between the
///   caller and every background heartbeat task.
/// - The returned future is `Send` so heartbeat tasks can be spawned
///   onto the Tokio runtime.
///
/// Implementations must not retry: a failed attempt is reported as
/// [`TransportError`] or as a non-2xx [`RawResponse`] and the [`Client`]
/// decides what happens next.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

/// Reason phrases for the statuses the hypervisor actually returns.
fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}
