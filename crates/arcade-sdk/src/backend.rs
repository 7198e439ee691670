//! Backend selection: a live hypervisor or the offline stand-in.

use arcade_transport::{ApiRequest, HttpTransport, RawResponse, Transport, TransportError};

use crate::{OfflineTransport, SdkConfig};

/// The transport chosen by [`SdkConfig`]: `ARCADE_MOCK=1` gives
/// [`Backend::Offline`], anything else talks HTTP to `base_url`.
#[derive(Debug, Clone)]
pub enum Backend {
    Hypervisor(HttpTransport),
    Offline(OfflineTransport),
}

impl Backend {
    /// # Errors
    /// [`TransportError::Unavailable`] if the base URL is unusable. The
    /// offline backend never fails.
    pub fn from_config(config: &SdkConfig) -> Result<Self, TransportError> {
        if config.offline {
            return Ok(Self::Offline(OfflineTransport::new()));
        }
        Ok(Self::Hypervisor(HttpTransport::new(&config.base_url)?))
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline(_))
    }
}

impl Transport for Backend {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        match self {
            Self::Hypervisor(http) => http.send(request).await,
            Self::Offline(offline) => offline.send(request).await,
        }
    }
}
