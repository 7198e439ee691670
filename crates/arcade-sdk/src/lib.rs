//! # Arcade SDK
//!
//! Game-server side of the Arcade hypervisor protocol.
//!
//! A game server uses this crate to tell the hypervisor what happens in a
//! match: which players joined (activating their *slips*), how they
//! scored, who beat whom, and what becomes of the *pool* they play for.
//! Slips and pools are kept alive with background heartbeats that start
//! and stop with their lifecycle.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arcade_sdk::prelude::*;
//!
//! # async fn run() -> Result<(), ArcadeError> {
//! let config = SdkConfig::from_env();
//! init_tracing(config.debug);
//! let sdk = ArcadeSdk::builder().config(config).build()?;
//!
//! let alice = SlipToken::new("alice-token");
//! let profile = sdk.activate_slip(&alice).await?;
//! sdk.report_player_score(&alice, 10).await?;
//! sdk.settle_slip(&alice).await?;
//! # let _ = profile;
//! # Ok(())
//! # }
//! ```
//!
//! ## Offline mode
//!
//! With `ARCADE_MOCK=1` every call is answered in-process by
//! [`OfflineTransport`], so a game can run without a control plane.

mod backend;
mod config;
mod error;
mod logging;
mod offline;
mod sdk;

pub use backend::Backend;
pub use config::{ENV_ADDR, ENV_DEBUG, ENV_MOCK, SdkConfig};
pub use error::ArcadeError;
pub use logging::init_tracing;
pub use offline::OfflineTransport;
pub use sdk::{ArcadeSdk, ArcadeSdkBuilder};

pub use arcade_heartbeat::{HeartbeatConfig, HeartbeatFailure, HeartbeatSubject};
pub use arcade_pool::{PoolError, PoolState};
pub use arcade_protocol::{
    ActivateSlipResponse, PoolId, ProtocolError, ScoreReport, ServerStatus, SlipToken,
};
pub use arcade_session::{SlipInfo, SlipState};
pub use arcade_transport::{ApiError, RetryConfig, RetryPolicy, Transport};

/// Everything a game server needs in one import.
pub mod prelude {
    pub use crate::{
        ActivateSlipResponse, ApiError, ArcadeError, ArcadeSdk, HeartbeatFailure, PoolId,
        PoolState, ScoreReport, SdkConfig, ServerStatus, SlipInfo, SlipState, SlipToken,
        init_tracing,
    };
}
