//! Error types for the pool layer.

use arcade_protocol::PoolId;
use arcade_transport::ApiError;

use crate::PoolState;

/// Errors from pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool's local state doesn't allow this operation, e.g. locking
    /// a pool that was already settled. Nothing was sent.
    #[error("cannot {operation} {pool} while {state}")]
    InvalidState {
        pool: PoolId,
        state: PoolState,
        operation: &'static str,
    },

    /// The remote call failed. Passed through unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl PoolError {
    /// The HTTP status behind this error, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.status(),
            Self::InvalidState { .. } => None,
        }
    }
}
