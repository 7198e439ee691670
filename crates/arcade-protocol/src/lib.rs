//! Wire protocol for the Arcade hypervisor API.
//!
//! This crate defines what a game server and the hypervisor exchange:
//!
//! - **Types** ([`SlipToken`], [`PoolId`], [`ServerStatus`],
//!   [`ActivateSlipResponse`], [`ScoreReport`], request bodies) — the
//!   JSON shapes that travel over HTTP.
//! - **Endpoints** ([`Endpoint`]) — the fixed table of method + path for
//!   every remote operation.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how bodies are turned
//!   into bytes and back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong before or after
//!   the bytes hit the network.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about retries, timers, or sessions.
//!
//! ```text
//! SDK facade → Session / Pool → Transport (HTTP + retry) → Protocol (this crate)
//! ```

mod codec;
mod endpoint;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use endpoint::{Endpoint, Method};
pub use error::ProtocolError;
pub use types::{
    ActivateSlipResponse, DefeatRequest, PoolId, ReturnPoolRequest,
    ScoreReport, ServerStatus, SlipToken,
};
