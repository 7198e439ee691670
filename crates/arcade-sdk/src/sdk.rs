//! `ArcadeSdk` builder and facade.
//!
//! This is the entry point for a game server talking to the hypervisor.
//! It ties the layers together: transport → session registry → pool
//! controllers.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use arcade_heartbeat::FailureSender;
use arcade_pool::{PoolController, PoolState};
use arcade_protocol::{ActivateSlipResponse, Endpoint, PoolId, ScoreReport, ServerStatus, SlipToken};
use arcade_session::{SessionRegistry, SlipInfo};
use arcade_transport::{ApiError, ApiRequest, Client, Transport, TransportError};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{ArcadeError, Backend, SdkConfig};

/// Builder for an [`ArcadeSdk`].
///
/// # Example
///
/// ```rust,no_run
/// use arcade_sdk::prelude::*;
///
/// # async fn run() -> Result<(), ArcadeError> {
/// let (failures, _failed) = tokio::sync::mpsc::unbounded_channel();
/// let sdk = ArcadeSdk::builder()
///     .config(SdkConfig::from_env())
///     .heartbeat_failures(failures)
///     .build()?;
///
/// let _status = sdk.get_server_status().await?;
/// # Ok(())
/// # }
/// ```
pub struct ArcadeSdkBuilder {
    config: SdkConfig,
    failures: Option<FailureSender<ApiError>>,
}

impl ArcadeSdkBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SdkConfig::default(),
            failures: None,
        }
    }

    pub fn config(mut self, config: SdkConfig) -> Self {
        self.config = config;
        self
    }

    /// Where failed heartbeats of slips and pools are reported.
    ///
    /// Without a sender, failures are only logged.
    pub fn heartbeat_failures(mut self, sender: FailureSender<ApiError>) -> Self {
        self.failures = Some(sender);
        self
    }

    /// Builds the SDK on the backend the config asks for.
    ///
    /// # Errors
    /// [`ApiError::TransportUnavailable`] if the base URL is unusable.
    pub fn build(self) -> Result<ArcadeSdk<Backend>, ArcadeError> {
        let backend = Backend::from_config(&self.config).map_err(|err| match err {
            TransportError::Unavailable(reason) | TransportError::Network(reason) => {
                ApiError::TransportUnavailable(reason)
            }
        })?;
        Ok(self.build_with_transport(backend))
    }

    /// Builds the SDK on any transport.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> ArcadeSdk<T> {
        let client = Client::new(transport, self.config.retry);

        let mut sessions = SessionRegistry::new(client.clone(), self.config.session_config());
        if let Some(failures) = &self.failures {
            sessions = sessions.with_failures(failures.clone());
        }

        info!(
            base_url = %self.config.base_url,
            offline = self.config.offline,
            "Arcade SDK ready"
        );

        ArcadeSdk {
            client,
            sessions,
            pools: Mutex::new(Pools::default()),
            config: self.config,
            failures: self.failures,
        }
    }
}

impl Default for ArcadeSdkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The operations a game server performs against the hypervisor.
///
/// Player calls go through the [`SessionRegistry`], pool calls through
/// one [`PoolController`] per [`PoolId`]. Errors from the hypervisor are
/// passed through as they came; local state only changes after a call
/// succeeds.
///
/// A pool that settles or is returned moves out of the live set into a
/// short history ([`ArcadeSdk::CLOSED_POOL_HISTORY`] entries), where it
/// still answers [`pool_state`](Self::pool_state) and refuses further
/// calls.
pub struct ArcadeSdk<T: Transport> {
    client: Client<T>,
    sessions: SessionRegistry<T>,
    pools: Mutex<Pools<T>>,
    config: SdkConfig,
    failures: Option<FailureSender<ApiError>>,
}

struct Pools<T: Transport> {
    live: HashMap<PoolId, Arc<PoolController<T>>>,
    /// Most recently closed last.
    closed: VecDeque<Arc<PoolController<T>>>,
}

impl<T: Transport> Default for Pools<T> {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
            closed: VecDeque::new(),
        }
    }
}

impl<T: Transport> Pools<T> {
    fn get(&self, pool: &PoolId) -> Option<Arc<PoolController<T>>> {
        self.live
            .get(pool)
            .or_else(|| self.closed.iter().rev().find(|c| c.id() == pool))
            .cloned()
    }

    /// Moves a controller that just closed into the history.
    fn retire(&mut self, controller: &Arc<PoolController<T>>) {
        let pool = controller.id();
        let current = self
            .live
            .get(pool)
            .is_some_and(|live| Arc::ptr_eq(live, controller));
        if !current {
            return;
        }
        self.live.remove(pool);
        self.closed.retain(|c| c.id() != pool);
        self.closed.push_back(Arc::clone(controller));
        while self.closed.len() > ArcadeSdk::<T>::CLOSED_POOL_HISTORY {
            self.closed.pop_front();
        }
    }
}

impl ArcadeSdk<Backend> {
    /// Creates a new builder.
    pub fn builder() -> ArcadeSdkBuilder {
        ArcadeSdkBuilder::new()
    }

    /// Shorthand for a builder configured from the environment.
    pub fn from_env() -> Result<Self, ArcadeError> {
        Self::builder().config(SdkConfig::from_env()).build()
    }
}

impl<T: Transport> ArcadeSdk<T> {
    /// How many settled or returned pools stay visible.
    pub const CLOSED_POOL_HISTORY: usize = 16;

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// The transport underneath. Useful for inspecting test doubles.
    pub fn transport(&self) -> &T {
        self.client.transport()
    }

    // -- Server --------------------------------------------------------

    /// Fetches the server snapshot.
    ///
    /// Polls until the hypervisor answers: a freshly booted game server
    /// may be asked before the hypervisor has assigned it work.
    pub async fn get_server_status(&self) -> Result<ServerStatus, ArcadeError> {
        let status = self
            .client
            .call_json(ApiRequest::new(Endpoint::ServerStatus))
            .await?;
        Ok(status)
    }

    /// Tells the hypervisor this game server is done. Running heartbeats
    /// are left alone.
    pub async fn shutdown(&self) -> Result<(), ArcadeError> {
        self.client.call(ApiRequest::new(Endpoint::Shutdown)).await?;
        info!("shutdown requested");
        Ok(())
    }

    // -- Slips ---------------------------------------------------------

    pub async fn activate_slip(&self, token: &SlipToken) -> Result<ActivateSlipResponse, ArcadeError> {
        Ok(self.sessions.activate(token).await?)
    }

    pub async fn settle_slip(&self, token: &SlipToken) -> Result<(), ArcadeError> {
        Ok(self.sessions.settle(token).await?)
    }

    /// Reports a score for an active slip.
    ///
    /// Accepts anything convertible to a [`ScoreReport`]. Integers always
    /// convert; an `f64` with a fractional part is rejected with
    /// [`ProtocolError::NonIntegerScore`](arcade_protocol::ProtocolError)
    /// before anything is sent.
    pub async fn report_player_score<S>(&self, token: &SlipToken, score: S) -> Result<(), ArcadeError>
    where
        S: TryInto<ScoreReport>,
        ArcadeError: From<S::Error>,
    {
        let score = score.try_into()?;
        Ok(self.sessions.report_score(token, score).await?)
    }

    /// Records that `defeated` lost to `winner`.
    pub async fn player_defeated(&self, defeated: &SlipToken, winner: &SlipToken) -> Result<(), ArcadeError> {
        Ok(self.sessions.mark_defeated_by(defeated, winner).await?)
    }

    /// Records that `defeated` lost to the environment.
    pub async fn player_self_defeat(&self, defeated: &SlipToken) -> Result<(), ArcadeError> {
        Ok(self.sessions.mark_self_defeated(defeated).await?)
    }

    pub async fn slip(&self, token: &SlipToken) -> Option<SlipInfo> {
        self.sessions.slip(token).await
    }

    pub async fn active_slips(&self) -> Vec<SlipToken> {
        self.sessions.active_slips().await
    }

    // -- Pools ---------------------------------------------------------

    /// Starts the heartbeat loop for `pool`: one beat now, then one per
    /// interval until the pool is settled or returned.
    ///
    /// Returns `false` if the loop was already running. Starting a pool
    /// whose previous incarnation was settled or returned opens a fresh
    /// one under the same id.
    pub async fn start_pool_heartbeat(&self, pool: &PoolId) -> bool {
        let controller = {
            let mut pools = self.pools.lock().await;
            let existing = pools.live.get(pool).cloned();
            let live = match &existing {
                Some(controller) => controller.state().await.is_live(),
                None => false,
            };
            match existing {
                Some(controller) if live => controller,
                _ => {
                    let controller = Arc::new(self.new_pool(pool));
                    pools.closed.retain(|c| c.id() != pool);
                    pools.live.insert(pool.clone(), Arc::clone(&controller));
                    controller
                }
            }
        };
        controller.start_heartbeat_loop().await
    }

    pub async fn lock_pool(&self, pool: &PoolId) -> Result<(), ArcadeError> {
        Ok(self.pool(pool).await.lock().await?)
    }

    /// Returns the pool's stakes with a human-readable `reason`.
    pub async fn return_pool(&self, pool: &PoolId, reason: &str) -> Result<(), ArcadeError> {
        let controller = self.pool(pool).await;
        controller.return_pool(reason).await?;
        self.pools.lock().await.retire(&controller);
        Ok(())
    }

    /// Awards the pool to `winner`. The hypervisor rejects this unless
    /// every other participant was marked defeated first.
    pub async fn settle_pool(&self, pool: &PoolId, winner: &SlipToken) -> Result<(), ArcadeError> {
        let controller = self.pool(pool).await;
        controller.settle(winner).await?;
        self.pools.lock().await.retire(&controller);
        Ok(())
    }

    /// Current state of a pool this SDK has touched.
    pub async fn pool_state(&self, pool: &PoolId) -> Option<PoolState> {
        let controller = self.pools.lock().await.get(pool)?;
        Some(controller.state().await)
    }

    /// Heartbeats started so far for a pool.
    pub async fn pool_heartbeat_beats(&self, pool: &PoolId) -> Option<u64> {
        let controller = self.pools.lock().await.get(pool)?;
        Some(controller.heartbeat_beats().await)
    }

    /// Pools on record: the live ones plus the closed-pool history.
    pub async fn pool_count(&self) -> usize {
        let pools = self.pools.lock().await;
        pools.live.len() + pools.closed.len()
    }

    /// The pool's controller. A pool never seen before is created open
    /// (and not heartbeating); a recently closed one is returned as is.
    async fn pool(&self, pool: &PoolId) -> Arc<PoolController<T>> {
        let mut pools = self.pools.lock().await;
        if let Some(controller) = pools.get(pool) {
            return controller;
        }
        debug!(%pool, "tracking pool");
        let controller = Arc::new(self.new_pool(pool));
        pools.live.insert(pool.clone(), Arc::clone(&controller));
        controller
    }

    fn new_pool(&self, pool: &PoolId) -> PoolController<T> {
        let controller = PoolController::new(pool.clone(), self.client.clone(), self.config.pool_config());
        match &self.failures {
            Some(failures) => controller.with_failures(failures.clone()),
            None => controller,
        }
    }
}
