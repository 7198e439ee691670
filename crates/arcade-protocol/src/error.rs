//! Error types for the protocol layer.
//!
//! Each crate in the SDK defines its own error enum. A `ProtocolError`
//! always means the problem is in the shape of the data, never in the
//! network or in lifecycle bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a request body failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A response body could not be parsed into the expected type.
    ///
    /// Usually means the hypervisor answered 2xx with a body that is
    /// missing required fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A score was not an integer.
    ///
    /// The hypervisor only accepts whole-number scores; this is caught
    /// locally so nothing is transmitted.
    #[error("score must be an integer, got {0}")]
    NonIntegerScore(f64),
}
