//! The request client: one logical call = attempts + classification + backoff.

use std::sync::Arc;

use arcade_protocol::{Codec, JsonCodec};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, trace, warn};

use crate::retry::{Outcome, RetryConfig, classify};
use crate::{ApiError, ApiRequest, RawResponse, Transport, TransportError};

/// Performs logical calls against the hypervisor.
///
/// Cheap to clone: the transport is behind an `Arc`, so the SDK facade
/// and every heartbeat task can hold their own `Client`.
///
/// The client is stateless across calls. Everything it knows about a
/// call is in the [`ApiRequest`] and the [`RetryConfig`].
pub struct Client<T: Transport> {
    transport: Arc<T>,
    codec: JsonCodec,
    retry: RetryConfig,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            codec: self.codec,
            retry: self.retry,
        }
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, retry: RetryConfig) -> Self {
        Self::from_arc(Arc::new(transport), retry)
    }

    pub fn from_arc(transport: Arc<T>, retry: RetryConfig) -> Self {
        Self {
            transport,
            codec: JsonCodec,
            retry: retry.validated(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Encodes a request body.
    pub fn encode<B: Serialize>(&self, body: &B) -> Result<Vec<u8>, ApiError> {
        Ok(self.codec.encode(body)?)
    }

    /// Performs the call and decodes the 2xx payload as `R`.
    pub async fn call_json<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<R, ApiError> {
        let response = self.call(request).await?;
        Ok(self.codec.decode(&response.body)?)
    }

    /// Performs the call, retrying according to the endpoint's policy.
    ///
    /// # Errors
    /// - [`ApiError::ClientRejected`] — a 300–499 under bounded backoff
    /// - [`ApiError::RetriesExhausted`] — every attempt failed retryably
    /// - [`ApiError::TransportUnavailable`] — the transport can't send at all
    pub async fn call(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        self.attempt_all(request, None).await
    }

    /// Like [`call`](Self::call), but gives up once `cancel` reads `true`.
    ///
    /// An attempt already sent is allowed to finish; no new attempt
    /// starts after cancellation, and a pending backoff is cut short. A
    /// dropped sender counts as cancelled.
    ///
    /// # Errors
    /// Everything [`call`](Self::call) returns, plus
    /// [`ApiError::Cancelled`].
    pub async fn call_until(
        &self,
        request: ApiRequest,
        cancel: watch::Receiver<bool>,
    ) -> Result<RawResponse, ApiError> {
        self.attempt_all(request, Some(cancel)).await
    }

    async fn attempt_all(
        &self,
        request: ApiRequest,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<RawResponse, ApiError> {
        let endpoint = request.endpoint;
        let policy = self.retry.policy_for(endpoint);
        let mut attempt: u32 = 0;
        let mut last_status = None;

        loop {
            if cancel.as_ref().is_some_and(is_cancelled) {
                debug!(%endpoint, attempts = attempt, "call cancelled");
                return Err(ApiError::Cancelled {
                    endpoint,
                    attempts: attempt,
                });
            }
            attempt += 1;
            trace!(%endpoint, attempt, "sending request");

            let failure = match self.transport.send(&request).await {
                Ok(response) => match classify(response.status) {
                    Outcome::Success => {
                        debug!(%endpoint, status = response.status, attempt, "request succeeded");
                        return Ok(response);
                    }
                    // Polling treats every failure alike.
                    Outcome::Fatal if !policy.is_polling() => {
                        warn!(%endpoint, status = response.status, "request rejected");
                        let body = response.body_text();
                        return Err(ApiError::ClientRejected {
                            endpoint,
                            status: response.status,
                            reason: response.reason,
                            body,
                        });
                    }
                    Outcome::Fatal | Outcome::Retryable => {
                        last_status = Some(response.status);
                        format!("status {}", response.status)
                    }
                },
                Err(TransportError::Unavailable(reason)) => {
                    warn!(%endpoint, %reason, "hypervisor unavailable");
                    return Err(ApiError::TransportUnavailable(reason));
                }
                Err(TransportError::Network(reason)) => reason,
            };

            let Some(delay) = policy.delay_before_retry(attempt) else {
                warn!(%endpoint, attempts = attempt, ?last_status, "giving up");
                return Err(ApiError::RetriesExhausted {
                    endpoint,
                    attempts: attempt,
                    last_status,
                });
            };

            debug!(
                %endpoint,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "request failed, retrying"
            );
            match cancel.as_mut() {
                Some(cancel) => {
                    tokio::select! {
                        _ = time::sleep(delay) => {}
                        // Only ever changes to `true`; an error means the sender is gone.
                        _ = cancel.wait_for(|cancelled| *cancelled) => {}
                    }
                }
                None => time::sleep(delay).await,
            }
        }
    }
}

fn is_cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow() || cancel.has_changed().is_err()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use arcade_protocol::{Endpoint, ServerStatus, SlipToken};

    use super::*;
    use crate::testing::{Reply, ScriptedTransport};

    fn client() -> Client<ScriptedTransport> {
        Client::new(ScriptedTransport::new(), RetryConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_success_single_attempt() {
        let client = client();
        let resp = client
            .call(ApiRequest::new(Endpoint::LockPool))
            .await
            .expect("200 should succeed");
        assert_eq!(resp.status, 200);
        assert_eq!(client.transport().count(Endpoint::LockPool), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_404_rejected_without_retry() {
        let client = client();
        client
            .transport()
            .push(Endpoint::SettleSlip, Reply::Status(404));

        let err = client
            .call(ApiRequest::new(Endpoint::SettleSlip))
            .await
            .expect_err("404 should fail");

        assert!(matches!(
            err,
            ApiError::ClientRejected { status: 404, ref reason, .. } if reason == "Not Found"
        ));
        assert_eq!(client.transport().count(Endpoint::SettleSlip), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_network_failures_exhaust_after_five_attempts() {
        let client = client();
        for _ in 0..5 {
            client
                .transport()
                .push(Endpoint::ActivateSlip, Reply::NetworkFailure);
        }

        let err = client
            .call(ApiRequest::new(Endpoint::ActivateSlip).bearer(&SlipToken::new("alice")))
            .await
            .expect_err("should exhaust");

        assert!(matches!(
            err,
            ApiError::RetriesExhausted { attempts: 5, last_status: None, .. }
        ));

        let sent = client.transport().requests_to(Endpoint::ActivateSlip);
        assert_eq!(sent.len(), 5);
        let gaps: Vec<Duration> = sent.windows(2).map(|w| w[1].at - w[0].at).collect();
        let ms = |n| Duration::from_millis(n);
        assert_eq!(gaps, vec![ms(200), ms(400), ms(600), ms(800)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_5xx_then_success_recovers() {
        let client = client();
        client.transport().push(Endpoint::LockPool, Reply::Status(503));
        client.transport().push(Endpoint::LockPool, Reply::Status(502));

        client
            .call(ApiRequest::new(Endpoint::LockPool))
            .await
            .expect("third attempt succeeds");
        assert_eq!(client.transport().count(Endpoint::LockPool), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_exhausted_carries_last_status() {
        let client = client();
        for _ in 0..4 {
            client.transport().push(Endpoint::Shutdown, Reply::Status(500));
        }
        client.transport().push(Endpoint::Shutdown, Reply::Status(503));

        let err = client
            .call(ApiRequest::new(Endpoint::Shutdown))
            .await
            .expect_err("should exhaust");
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_unavailable_fails_immediately() {
        let client = client();
        client
            .transport()
            .push(Endpoint::LockPool, Reply::Unavailable);

        let err = client
            .call(ApiRequest::new(Endpoint::LockPool))
            .await
            .expect_err("should fail");
        assert!(matches!(err, ApiError::TransportUnavailable(_)));
        assert_eq!(client.transport().count(Endpoint::LockPool), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_probe_polls_through_any_failure() {
        let client = client();
        let t = client.transport();
        t.push(Endpoint::ServerStatus, Reply::NetworkFailure);
        t.push(Endpoint::ServerStatus, Reply::Status(404));
        t.push(Endpoint::ServerStatus, Reply::Status(503));
        t.push(
            Endpoint::ServerStatus,
            Reply::json(200, &ServerStatus {
                random_seed: "42".into(),
            }),
        );

        let status: ServerStatus = client
            .call_json(ApiRequest::new(Endpoint::ServerStatus))
            .await
            .expect("polling ends on success");
        assert_eq!(status.random_seed, "42");

        let sent = t.requests_to(Endpoint::ServerStatus);
        assert_eq!(sent.len(), 4);
        for pair in sent.windows(2) {
            assert_eq!(pair[1].at - pair[0].at, Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_until_stops_retrying_once_cancelled() {
        let client = client();
        for _ in 0..5 {
            client.transport().push(Endpoint::PoolHeartbeat, Reply::Status(503));
        }
        let (cancel, cancelled) = watch::channel(false);

        let call = client.call_until(ApiRequest::new(Endpoint::PoolHeartbeat), cancelled);
        let cancel_mid_backoff = async {
            time::sleep(Duration::from_millis(300)).await;
            cancel.send_replace(true);
        };
        let (result, ()) = tokio::join!(call, cancel_mid_backoff);

        assert!(matches!(
            result,
            Err(ApiError::Cancelled { attempts: 2, .. })
        ));
        let sent = client.transport().requests_to(Endpoint::PoolHeartbeat);
        assert_eq!(sent.len(), 2, "no attempt after cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_until_already_cancelled_sends_nothing() {
        let client = client();
        let (_cancel, cancelled) = watch::channel(true);

        let err = client
            .call_until(ApiRequest::new(Endpoint::SlipHeartbeat), cancelled)
            .await
            .expect_err("cancelled before the first attempt");

        assert!(matches!(err, ApiError::Cancelled { attempts: 0, .. }));
        assert_eq!(client.transport().count(Endpoint::SlipHeartbeat), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_until_live_signal_behaves_like_call() {
        let client = client();
        client.transport().push(Endpoint::LockPool, Reply::Status(503));
        let (_cancel, cancelled) = watch::channel(false);

        client
            .call_until(ApiRequest::new(Endpoint::LockPool), cancelled)
            .await
            .expect("second attempt succeeds");
        assert_eq!(client.transport().count(Endpoint::LockPool), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_json_decode_failure_is_protocol_error() {
        let client = client();
        client.transport().push(
            Endpoint::ActivateSlip,
            Reply::Body(200, b"{\"nope\":1}".to_vec()),
        );

        let result: Result<arcade_protocol::ActivateSlipResponse, _> = client
            .call_json(ApiRequest::new(Endpoint::ActivateSlip))
            .await;
        assert!(matches!(result, Err(ApiError::Protocol(_))));
    }
}
