//! The pool controller: one pool, its state, and its heartbeat.

use arcade_heartbeat::{FailureSender, HeartbeatSubject, HeartbeatTask};
use arcade_protocol::{Endpoint, PoolId, ReturnPoolRequest, SlipToken};
use arcade_transport::{ApiError, ApiRequest, Client, Transport};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{PoolConfig, PoolError, PoolState};

struct Inner {
    state: PoolState,
    heartbeat: Option<HeartbeatTask>,
    /// Beat count of the last heartbeat task, kept after it stops.
    beats: u64,
}

/// Drives one pool through its lifecycle.
///
/// The controller owns at most one heartbeat task. It is started by
/// [`start_heartbeat_loop`](Self::start_heartbeat_loop) and stopped when
/// the pool is settled or returned.
///
/// Local checks are limited to the state machine: locking a pool twice
/// or settling a returned pool fails with [`PoolError::InvalidState`]
/// without touching the network. Everything else, such as whether all
/// losers have been marked defeated before a settle, is the hypervisor's
/// call, and its rejection comes back verbatim as [`PoolError::Api`].
pub struct PoolController<T: Transport> {
    id: PoolId,
    client: Client<T>,
    config: PoolConfig,
    failures: Option<FailureSender<ApiError>>,
    inner: Mutex<Inner>,
}

impl<T: Transport> PoolController<T> {
    /// Creates a controller for an open pool. No heartbeat runs yet.
    pub fn new(id: PoolId, client: Client<T>, config: PoolConfig) -> Self {
        Self {
            id,
            client,
            config,
            failures: None,
            inner: Mutex::new(Inner {
                state: PoolState::Open,
                heartbeat: None,
                beats: 0,
            }),
        }
    }

    /// Delivers this pool's heartbeat failures to `sender`.
    pub fn with_failures(mut self, sender: FailureSender<ApiError>) -> Self {
        self.failures = Some(sender);
        self
    }

    pub fn id(&self) -> &PoolId {
        &self.id
    }

    pub async fn state(&self) -> PoolState {
        self.inner.lock().await.state
    }

    pub async fn heartbeat_running(&self) -> bool {
        self.inner.lock().await.heartbeat.is_some()
    }

    /// Heartbeats started so far, including those of a stopped loop.
    pub async fn heartbeat_beats(&self) -> u64 {
        let inner = self.inner.lock().await;
        inner.heartbeat.as_ref().map_or(inner.beats, HeartbeatTask::beats)
    }

    /// Starts heartbeating: one beat now, then one per interval.
    ///
    /// Returns `false` and does nothing if the loop is already running or
    /// the pool has reached a terminal state.
    pub async fn start_heartbeat_loop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.heartbeat.is_some() {
            debug!(pool = %self.id, "heartbeat loop already running");
            return false;
        }
        if inner.state.is_terminal() {
            warn!(pool = %self.id, state = %inner.state, "not starting heartbeat for a closed pool");
            return false;
        }

        inner.heartbeat = Some(self.spawn_heartbeat());
        info!(pool = %self.id, "pool heartbeat started");
        true
    }

    /// Locks the pool. The heartbeat keeps running.
    pub async fn lock(&self) -> Result<(), PoolError> {
        self.check(PoolState::Locked, "lock").await?;
        self.client
            .call(ApiRequest::new(Endpoint::LockPool).pool(&self.id))
            .await?;
        self.inner.lock().await.state = PoolState::Locked;
        info!(pool = %self.id, "pool locked");
        Ok(())
    }

    /// Returns the stakes to the players and stops the heartbeat.
    pub async fn return_pool(&self, reason: &str) -> Result<(), PoolError> {
        self.check(PoolState::Returned, "return").await?;
        let body = self.client.encode(&ReturnPoolRequest {
            reason: reason.to_owned(),
        })?;
        self.client
            .call(ApiRequest::new(Endpoint::ReturnPool).pool(&self.id).body(body))
            .await?;
        self.close(PoolState::Returned).await;
        info!(pool = %self.id, reason, "pool returned");
        Ok(())
    }

    /// Awards the pool to `winner` and stops the heartbeat.
    ///
    /// The request is authenticated as the winner.
    pub async fn settle(&self, winner: &SlipToken) -> Result<(), PoolError> {
        self.check(PoolState::Settled, "settle").await?;
        self.client
            .call(ApiRequest::new(Endpoint::SettlePool).bearer(winner).pool(&self.id))
            .await?;
        self.close(PoolState::Settled).await;
        info!(pool = %self.id, %winner, "pool settled");
        Ok(())
    }

    async fn check(&self, target: PoolState, operation: &'static str) -> Result<(), PoolError> {
        let state = self.inner.lock().await.state;
        if state.can_transition_to(target) {
            Ok(())
        } else {
            Err(PoolError::InvalidState {
                pool: self.id.clone(),
                state,
                operation,
            })
        }
    }

    async fn close(&self, state: PoolState) {
        let mut inner = self.inner.lock().await;
        inner.state = state;
        if let Some(task) = inner.heartbeat.take() {
            inner.beats = task.beats();
            task.cancel();
        }
    }

    fn spawn_heartbeat(&self) -> HeartbeatTask {
        let client = self.client.clone();
        let request = ApiRequest::new(Endpoint::PoolHeartbeat).pool(&self.id);
        HeartbeatTask::spawn(
            HeartbeatSubject::Pool(self.id.clone()),
            &self.config.heartbeat,
            self.failures.clone(),
            move |cancelled| {
                let client = client.clone();
                let request = request.clone();
                async move { client.call_until(request, cancelled).await.map(drop) }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arcade_transport::RetryConfig;
    use arcade_transport::testing::{Reply, ScriptedTransport};

    use super::*;

    fn controller(id: PoolId) -> (Arc<ScriptedTransport>, PoolController<Arc<ScriptedTransport>>) {
        let transport = Arc::new(ScriptedTransport::new());
        let client = Client::new(Arc::clone(&transport), RetryConfig::default());
        (transport, PoolController::new(id, client, PoolConfig::default()))
    }

    #[tokio::test]
    async fn test_lock_twice_fails_locally() {
        let (transport, pool) = controller(PoolId::Implicit);
        pool.lock().await.expect("first lock");

        let err = pool.lock().await.expect_err("second lock");
        assert!(matches!(
            err,
            PoolError::InvalidState { state: PoolState::Locked, .. }
        ));
        assert_eq!(transport.count(Endpoint::LockPool), 1);
    }

    #[tokio::test]
    async fn test_named_pool_sends_pool_id() {
        let (transport, pool) = controller(PoolId::named("table-9"));
        pool.lock().await.expect("lock");

        let sent = transport.requests_to(Endpoint::LockPool);
        assert_eq!(sent[0].request.pool_id.as_deref(), Some("table-9"));
    }

    #[tokio::test]
    async fn test_settle_rejection_leaves_pool_open() {
        let (transport, pool) = controller(PoolId::Implicit);
        transport.push(
            Endpoint::SettlePool,
            Reply::Body(409, b"players remaining".to_vec()),
        );

        let err = pool
            .settle(&SlipToken::new("winner"))
            .await
            .expect_err("409");

        match err {
            PoolError::Api(ApiError::ClientRejected { status, body, .. }) => {
                assert_eq!(status, 409);
                assert_eq!(body, "players remaining");
            }
            other => panic!("expected ClientRejected, got {other:?}"),
        }
        assert_eq!(pool.state().await, PoolState::Open);
    }

    #[tokio::test]
    async fn test_settle_after_return_fails_locally() {
        let (transport, pool) = controller(PoolId::Implicit);
        pool.return_pool("players tied").await.expect("return");

        let err = pool.settle(&SlipToken::new("w")).await.expect_err("closed");
        assert!(err.status().is_none());
        assert_eq!(transport.count(Endpoint::SettlePool), 0);
    }
}
