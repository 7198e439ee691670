//! The offline stand-in for a hypervisor.

use arcade_protocol::{ActivateSlipResponse, Codec, Endpoint, JsonCodec, ServerStatus};
use arcade_transport::{ApiRequest, RawResponse, Transport, TransportError};
use tracing::{info, trace};

/// Answers every call immediately with a canned success.
///
/// Selected with `ARCADE_MOCK=1` so a game server can run without a
/// control plane. Nothing leaves the process: the status probe returns
/// the seed `"not-random"`, activation returns a fixed "Mock Player"
/// profile, and every other call succeeds with an empty body.
#[derive(Debug, Clone, Copy)]
pub struct OfflineTransport {
    codec: JsonCodec,
}

impl OfflineTransport {
    pub const RANDOM_SEED: &'static str = "not-random";
    pub const DISPLAY_NAME: &'static str = "Mock Player";
    pub const PLAYER_ID: &'static str = "p1";

    pub fn new() -> Self {
        info!("Arcade SDK running in offline mode");
        Self { codec: JsonCodec }
    }

    fn respond(&self, endpoint: Endpoint) -> Result<RawResponse, TransportError> {
        let body = match endpoint {
            Endpoint::ServerStatus => self.encode(&ServerStatus {
                random_seed: Self::RANDOM_SEED.to_owned(),
            })?,
            Endpoint::ActivateSlip => self.encode(&ActivateSlipResponse {
                display_name: Self::DISPLAY_NAME.to_owned(),
                player_id: Some(Self::PLAYER_ID.to_owned()),
            })?,
            _ => Vec::new(),
        };
        Ok(RawResponse::status(200).with_body(body))
    }

    fn encode<T: serde::Serialize>(&self, value: &T) -> Result<Vec<u8>, TransportError> {
        self.codec
            .encode(value)
            .map_err(|e| TransportError::Unavailable(format!("offline response: {e}")))
    }
}

impl Default for OfflineTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for OfflineTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        trace!(endpoint = %request.endpoint, "offline reply");
        self.respond(request.endpoint)
    }
}
