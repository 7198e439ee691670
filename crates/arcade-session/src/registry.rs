//! The session registry: every slip this game server knows about.
//!
//! The registry is responsible for:
//! - Activating slips with the hypervisor and starting their heartbeats
//! - Forwarding score reports
//! - Closing slips out (settle, defeat, self-defeat) and stopping their
//!   heartbeats
//!
//! # Ordering
//!
//! Every operation makes its remote call FIRST and touches local state
//! only once the hypervisor has said yes. A failed call leaves the
//! registry exactly as it was.
//!
//! # Concurrency note
//!
//! The slip map sits behind a Tokio `Mutex`, but the lock is only ever
//! held for bookkeeping, never across a network call. Heartbeat tasks
//! don't touch the map at all; they own a clone of the [`Client`] and the
//! token they beat for.
//!
//! # Memory
//!
//! Only active slips are kept in full. A closed slip leaves its record
//! and is remembered as a [`SlipInfo`] in a short history
//! ([`SessionConfig::closed_history`]), so a long-running server's
//! registry stays bounded by its live players.

use std::collections::{HashMap, VecDeque};

use arcade_heartbeat::{FailureSender, HeartbeatSubject, HeartbeatTask};
use arcade_protocol::{ActivateSlipResponse, DefeatRequest, Endpoint, ScoreReport, SlipToken};
use arcade_transport::{ApiError, ApiRequest, Client, Transport};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::slip::{Slip, SlipInfo, SlipState};
use crate::SessionConfig;

/// Tracks slips and owns one heartbeat task per active slip.
///
/// ## Lifecycle
///
/// ```text
/// activate() ──→ [Active] ──┬── settle()           ──→ [Settled]
///    ↑   │                  ├── mark_defeated_by() ──→ [DefeatedByOpponent]
///    └───┘ (replaces task)  └── mark_self_defeated() → [SelfDefeated]
/// ```
///
/// `report_score()` can be called any number of times while a slip is
/// active and doesn't change its state.
pub struct SessionRegistry<T: Transport> {
    client: Client<T>,
    config: SessionConfig,
    failures: Option<FailureSender<ApiError>>,
    slips: Mutex<Slips>,
}

#[derive(Default)]
struct Slips {
    active: HashMap<SlipToken, Slip>,
    /// Most recently closed last.
    closed: VecDeque<SlipInfo>,
}

impl Slips {
    fn get(&self, token: &SlipToken) -> Option<SlipInfo> {
        match self.active.get(token) {
            Some(slip) => Some(slip.info(token)),
            None => self.closed.iter().rev().find(|info| info.token == *token).cloned(),
        }
    }

    fn forget_closed(&mut self, token: &SlipToken) {
        self.closed.retain(|info| info.token != *token);
    }

    fn remember_closed(&mut self, info: SlipInfo, capacity: usize) {
        self.forget_closed(&info.token);
        self.closed.push_back(info);
        while self.closed.len() > capacity {
            self.closed.pop_front();
        }
    }
}

impl<T: Transport> SessionRegistry<T> {
    pub fn new(client: Client<T>, config: SessionConfig) -> Self {
        Self {
            client,
            config,
            failures: None,
            slips: Mutex::new(Slips::default()),
        }
    }

    /// Delivers heartbeat failures of every slip to `sender`.
    pub fn with_failures(mut self, sender: FailureSender<ApiError>) -> Self {
        self.failures = Some(sender);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Activates a slip and starts heartbeating for it.
    ///
    /// If the token already has a running heartbeat (activated twice
    /// without being closed out), the old task is cancelled and replaced,
    /// so there is never more than one task per token.
    ///
    /// # Errors
    /// Whatever the activation call returned. Nothing is recorded and no
    /// task is started.
    pub async fn activate(&self, token: &SlipToken) -> Result<ActivateSlipResponse, ApiError> {
        let profile: ActivateSlipResponse = self
            .client
            .call_json(ApiRequest::new(Endpoint::ActivateSlip).bearer(token))
            .await?;

        let task = self.spawn_heartbeat(token);
        let previous = {
            let mut slips = self.slips.lock().await;
            slips.forget_closed(token);
            slips
                .active
                .insert(token.clone(), Slip::active(profile.clone(), task))
        };

        if let Some(mut previous) = previous {
            if previous.stop_heartbeat() {
                debug!(%token, "replaced running heartbeat on re-activation");
            }
        }

        info!(%token, display_name = %profile.display_name, "slip activated");
        Ok(profile)
    }

    /// Reports a player's score. The slip stays active.
    pub async fn report_score(&self, token: &SlipToken, score: ScoreReport) -> Result<(), ApiError> {
        let body = self.client.encode(&score)?;
        self.client
            .call(ApiRequest::new(Endpoint::ReportScore).bearer(token).body(body))
            .await?;
        debug!(%token, score = score.score, "score reported");
        Ok(())
    }

    /// Settles a slip and stops its heartbeat.
    pub async fn settle(&self, token: &SlipToken) -> Result<(), ApiError> {
        self.client
            .call(ApiRequest::new(Endpoint::SettleSlip).bearer(token))
            .await?;
        self.close(token, SlipState::Settled).await;
        Ok(())
    }

    /// Records that `token` lost to `winner` and stops its heartbeat.
    pub async fn mark_defeated_by(&self, token: &SlipToken, winner: &SlipToken) -> Result<(), ApiError> {
        let body = self.client.encode(&DefeatRequest {
            winner_token: winner.clone(),
        })?;
        self.client
            .call(ApiRequest::new(Endpoint::DefeatSlip).bearer(token).body(body))
            .await?;
        self.close(token, SlipState::DefeatedByOpponent).await;
        Ok(())
    }

    /// Records that `token` lost to the environment and stops its heartbeat.
    pub async fn mark_self_defeated(&self, token: &SlipToken) -> Result<(), ApiError> {
        self.client
            .call(ApiRequest::new(Endpoint::SelfDefeatSlip).bearer(token))
            .await?;
        self.close(token, SlipState::SelfDefeated).await;
        Ok(())
    }

    /// Snapshot of one slip: active, or closed recently enough to still
    /// be in the history.
    pub async fn slip(&self, token: &SlipToken) -> Option<SlipInfo> {
        self.slips.lock().await.get(token)
    }

    /// Tokens of every slip that is currently active.
    pub async fn active_slips(&self) -> Vec<SlipToken> {
        self.slips.lock().await.active.keys().cloned().collect()
    }

    pub async fn active_count(&self) -> usize {
        self.slips.lock().await.active.len()
    }

    /// Number of slips on record: the active ones plus the closed-slip
    /// history.
    pub async fn len(&self) -> usize {
        let slips = self.slips.lock().await;
        slips.active.len() + slips.closed.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Applies a terminal state after the hypervisor accepted the call.
    ///
    /// A token the registry never saw is remembered as closed; there's
    /// no task to cancel and that's fine.
    async fn close(&self, token: &SlipToken, state: SlipState) {
        let mut slips = self.slips.lock().await;
        let info = match slips.active.remove(token) {
            Some(mut slip) => {
                let stopped = slip.close(state);
                info!(%token, %state, heartbeat_stopped = stopped, "slip closed");
                slip.info(token)
            }
            None => {
                info!(%token, %state, "unknown slip closed");
                Slip::closed(state).info(token)
            }
        };
        slips.remember_closed(info, self.config.closed_history);
    }

    fn spawn_heartbeat(&self, token: &SlipToken) -> HeartbeatTask {
        let client = self.client.clone();
        let request = ApiRequest::new(Endpoint::SlipHeartbeat).bearer(token);
        HeartbeatTask::spawn(
            HeartbeatSubject::Slip(token.clone()),
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
