use arcade_protocol::{Endpoint, ProtocolError};

/// Why a single attempt failed without producing a response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request left the process but no response came back
    /// (connection refused, reset, DNS failure). Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint can't be used at all: bad base URL, HTTP client
    /// could not be built. Nothing was sent, and retrying won't help.
    #[error("hypervisor unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by a logical call through [`Client`](crate::Client).
///
/// Every layer above (sessions, pools, the SDK facade) passes these
/// through untouched.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The hypervisor answered 300–499. Never retried. The status and
    /// body are surfaced as the server sent them; `reason` is the
    /// canonical phrase for the status code, empty for unknown codes.
    #[error("{endpoint} rejected with {status} {reason}: {body}")]
    ClientRejected {
        endpoint: Endpoint,
        status: u16,
        reason: String,
        body: String,
    },

    /// Retryable failures (network errors, 5xx) outlasted the attempt
    /// budget. `last_status` is the last HTTP status seen, if any
    /// attempt got that far.
    #[error("{endpoint} failed after {attempts} attempts (last status: {})", describe_status(.last_status))]
    RetriesExhausted {
        endpoint: Endpoint,
        attempts: u32,
        last_status: Option<u16>,
    },

    /// The caller withdrew the call between attempts, e.g. a heartbeat
    /// whose slip or pool closed while it was backing off.
    #[error("{endpoint} cancelled after {attempts} attempts")]
    Cancelled { endpoint: Endpoint, attempts: u32 },

    /// The hypervisor could not be reached at all.
    #[error("hypervisor unavailable: {0}")]
    TransportUnavailable(String),

    /// The call succeeded but the payload was malformed, or the request
    /// body could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ApiError {
    /// The HTTP status behind this error, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ClientRejected { status, .. } => Some(*status),
            Self::RetriesExhausted { last_status, .. } => *last_status,
            _ => None,
        }
    }
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "none".to_owned(),
    }
}
