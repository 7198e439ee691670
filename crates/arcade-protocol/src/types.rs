//! Core types for the hypervisor's wire format.
//!
//! Everything here is either an identity (who is this call about?) or a
//! JSON body (what does the call carry?).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's slip token.
///
/// The token is both the session identity (the registry is keyed by it)
/// and the bearer credential sent in the `Authorization` header. Because
/// it is a credential, `Display` and `Debug` only show a short prefix so
/// tokens never end up whole in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlipToken(String);

impl SlipToken {
    /// Number of leading characters kept when the token is displayed.
    const VISIBLE_PREFIX: usize = 4;

    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The full token, for use as a bearer credential.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(Self::VISIBLE_PREFIX).collect();
        if prefix.len() == self.0.len() {
            prefix
        } else {
            format!("{prefix}…")
        }
    }
}

impl From<&str> for SlipToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for SlipToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for SlipToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slip:{}", self.redacted())
    }
}

impl fmt::Debug for SlipToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SlipToken").field(&self.redacted()).finish()
    }
}

/// Identifies the pool a call is about.
///
/// Hypervisors that host several pools per game server expect every pool
/// call to name its pool; those use [`PoolId::Named`], which is sent as a
/// `pool_id` query parameter.
///
/// [`PoolId::Implicit`] is the legacy one-pool-per-process mode: nothing
/// identifying is sent and the hypervisor picks the only pool it knows.
/// Prefer named pools in new deployments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PoolId {
    /// The process-wide pool of legacy deployments.
    #[default]
    Implicit,
    /// An explicitly identified pool.
    Named(String),
}

impl PoolId {
    /// Creates a named pool identifier.
    pub fn named(id: impl Into<String>) -> Self {
        Self::Named(id.into())
    }

    /// The value to send as the `pool_id` query parameter, if any.
    pub fn as_query(&self) -> Option<&str> {
        match self {
            Self::Implicit => None,
            Self::Named(id) => Some(id),
        }
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Implicit => write!(f, "pool:implicit"),
            Self::Named(id) => write!(f, "pool:{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Snapshot returned by `GET /api/server`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Seed the game should use for its RNG so matches are reproducible.
    pub random_seed: String,
}

/// Returned when a slip is activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateSlipResponse {
    /// Name to show for this player in game.
    pub display_name: String,

    /// Session-scoped player identifier, when the hypervisor provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/player/report-score`.
///
/// The score is an `i64`, so a non-integer score can't be built from
/// Rust code at all. Callers holding a float go through
/// `ScoreReport::try_from(f64)`, which rejects fractional, infinite, and
/// NaN values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: i64,
}

impl ScoreReport {
    pub fn new(score: i64) -> Self {
        Self { score }
    }
}

impl From<i64> for ScoreReport {
    fn from(score: i64) -> Self {
        Self::new(score)
    }
}

impl From<i32> for ScoreReport {
    fn from(score: i32) -> Self {
        Self::new(i64::from(score))
    }
}

impl TryFrom<f64> for ScoreReport {
    type Error = ProtocolError;

    fn try_from(score: f64) -> Result<Self, Self::Error> {
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        let in_range = score >= i64::MIN as f64 && score < i64::MAX as f64;
        if !score.is_finite() || score.fract() != 0.0 || !in_range {
            return Err(ProtocolError::NonIntegerScore(score));
        }
        Ok(Self::new(score as i64))
    }
}

/// Body of `POST /api/player/defeat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefeatRequest {
    /// The token of the player who won the encounter.
    pub winner_token: SlipToken,
}

/// Body of `POST /api/pool/return`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPoolRequest {
    /// Human-readable reason, e.g. `"players tied"`.
    pub reason: String,
}
