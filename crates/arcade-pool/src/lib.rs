//! Pool lifecycle management for the Arcade SDK.
//!
//! A pool is the stake the players of a match compete for. Each pool is
//! driven by one [`PoolController`], which keeps the pool alive with a
//! heartbeat while it is open or locked and stops it when the pool is
//! settled or returned.
//!
//! # Key types
//!
//! - [`PoolController`] — lock / return / settle one pool, own its heartbeat
//! - [`PoolState`] — lifecycle state machine
//! - [`PoolConfig`] — heartbeat settings
//! - [`PoolError`] — local state violations plus pass-through call errors

mod config;
mod controller;
mod error;

pub use config::{PoolConfig, PoolState};
pub use controller::PoolController;
pub use error::PoolError;
