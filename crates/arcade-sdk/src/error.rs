//! Unified error type for the Arcade SDK.

use std::convert::Infallible;

use arcade_pool::PoolError;
use arcade_protocol::ProtocolError;
use arcade_transport::ApiError;

/// Top-level error returned by every [`ArcadeSdk`](crate::ArcadeSdk)
/// operation.
///
/// Call failures keep the shape the transport gave them: a rejected
/// pool settle is `ArcadeError::Api(ApiError::ClientRejected { .. })`
/// whichever layer it passed through.
#[derive(Debug, thiserror::Error)]
pub enum ArcadeError {
    /// A remote call failed (rejected, retries exhausted, unreachable).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Something was invalid before any request was built, e.g. a
    /// non-integer score.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The pool's local state doesn't allow the operation.
    #[error(transparent)]
    Pool(PoolError),
}

impl ArcadeError {
    /// The HTTP status behind this error, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.status(),
            _ => None,
        }
    }
}

impl From<PoolError> for ArcadeError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Api(err) => Self::Api(err),
            other => Self::Pool(other),
        }
    }
}

/// Lets infallible score conversions (`i64`, `i32`) go through the same
/// generic path as fallible ones.
impl From<Infallible> for ArcadeError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
