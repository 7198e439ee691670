//! The hypervisor's endpoint table.
//!
//! Every remote operation the SDK performs is one variant here. Keeping
//! method, path, and retry eligibility in one place means the transport
//! never has to guess whether a call is safe to repeat.

use std::fmt;

/// HTTP method used by an endpoint. The hypervisor API only uses two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A remote operation exposed by the hypervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /api/server`: fetch the server status (random seed).
    ServerStatus,
    /// `POST /api/server/shutdown`: ask the hypervisor to stop this server.
    Shutdown,
    /// `POST /api/player/activate`: activate a slip.
    ActivateSlip,
    /// `POST /api/player/heartbeat`: keep a slip alive.
    SlipHeartbeat,
    /// `POST /api/player/settle`: cash out a slip.
    SettleSlip,
    /// `POST /api/player/report-score`: report a leaderboard score.
    ReportScore,
    /// `POST /api/player/defeat`: the slip lost to another player.
    DefeatSlip,
    /// `POST /api/player/self-defeat`: the slip lost to the environment.
    SelfDefeatSlip,
    /// `POST /api/pool/lock`: no more joins.
    LockPool,
    /// `POST /api/pool/heartbeat`: keep the pool alive.
    PoolHeartbeat,
    /// `POST /api/pool/return`: no winner, return stakes.
    ReturnPool,
    /// `POST /api/pool/settle`: pay the pool out to a winner.
    SettlePool,
}

impl Endpoint {
    /// Every endpoint, in table order.
    pub const ALL: [Endpoint; 12] = [
        Self::ServerStatus,
        Self::Shutdown,
        Self::ActivateSlip,
        Self::SlipHeartbeat,
        Self::SettleSlip,
        Self::ReportScore,
        Self::DefeatSlip,
        Self::SelfDefeatSlip,
        Self::LockPool,
        Self::PoolHeartbeat,
        Self::ReturnPool,
        Self::SettlePool,
    ];

    pub fn method(self) -> Method {
        match self {
            Self::ServerStatus => Method::Get,
            _ => Method::Post,
        }
    }

    /// Absolute path below the hypervisor's base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::ServerStatus => "/api/server",
            Self::Shutdown => "/api/server/shutdown",
            Self::ActivateSlip => "/api/player/activate",
            Self::SlipHeartbeat => "/api/player/heartbeat",
            Self::SettleSlip => "/api/player/settle",
            Self::ReportScore => "/api/player/report-score",
            Self::DefeatSlip => "/api/player/defeat",
            Self::SelfDefeatSlip => "/api/player/self-defeat",
            Self::LockPool => "/api/pool/lock",
            Self::PoolHeartbeat => "/api/pool/heartbeat",
            Self::ReturnPool => "/api/pool/return",
            Self::SettlePool => "/api/pool/settle",
        }
    }

    /// `true` for read-only calls that may be repeated without limit.
    ///
    /// Only these are eligible for unbounded polling; everything else
    /// has side effects on the hypervisor.
    pub fn is_idempotent(self) -> bool {
        matches!(self, Self::ServerStatus)
    }

    /// `true` for the pool endpoints, which carry a pool identifier.
    pub fn is_pool_call(self) -> bool {
        matches!(
            self,
            Self::LockPool | Self::PoolHeartbeat | Self::ReturnPool | Self::SettlePool
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self.method() {
            Method::Get => "GET",
            Method::Post => "POST",
        };
        write!(f, "{method} {}", self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_server_status_is_get() {
        for endpoint in Endpoint::ALL {
            let expected = if endpoint == Endpoint::ServerStatus {
                Method::Get
            } else {
                Method::Post
            };
            assert_eq!(endpoint.method(), expected, "{endpoint}");
        }
    }

    #[test]
    fn test_only_server_status_is_idempotent() {
        let idempotent: Vec<_> = Endpoint::ALL
            .into_iter()
            .filter(|e| e.is_idempotent())
            .collect();
        assert_eq!(idempotent, vec![Endpoint::ServerStatus]);
    }

    #[test]
    fn test_paths_are_unique_and_under_api() {
        let mut paths: Vec<_> = Endpoint::ALL.iter().map(|e| e.path()).collect();
        assert!(paths.iter().all(|p| p.starts_with("/api/")));
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), Endpoint::ALL.len());
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::ServerStatus.to_string(), "GET /api/server");
        assert_eq!(
            Endpoint::ReportScore.to_string(),
            "POST /api/player/report-score"
        );
    }

    #[test]
    fn test_pool_calls() {
        assert!(Endpoint::SettlePool.is_pool_call());
        assert!(Endpoint::PoolHeartbeat.is_pool_call());
        assert!(!Endpoint::SettleSlip.is_pool_call());
    }
}
