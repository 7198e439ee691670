//! Pool configuration and the pool state machine.

use arcade_heartbeat::HeartbeatConfig;

// ---------------------------------------------------------------------------
// PoolConfig
// ---------------------------------------------------------------------------

/// Settings for a pool controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Heartbeat schedule while the pool is open or locked.
    ///
    /// Default: one beat as soon as the loop starts, then every 10
    /// seconds.
    pub heartbeat: HeartbeatConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            heartbeat: HeartbeatConfig::default().immediate(),
        }
    }
}

// ---------------------------------------------------------------------------
// PoolState
// ---------------------------------------------------------------------------

/// The lifecycle state of a pool.
///
/// ```text
///   Open ──(lock)──→ Locked
///    │                 │
///    ├──(settle)───────┼──→ Settled
///    │                 │
///    └──(return)───────┴──→ Returned
/// ```
///
/// - **Open**: players can still join; the pool heartbeats.
/// - **Locked**: the match is under way; the pool still heartbeats.
/// - **Settled**: a winner took the pool. Terminal.
/// - **Returned**: stakes went back to the players. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolState {
    Open,
    Locked,
    Settled,
    Returned,
}

impl PoolState {
    /// Returns `true` while the pool should be heartbeating.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Open | Self::Locked)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_live()
    }

    /// Returns `true` if moving to `target` is a valid transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Open, Self::Locked) => true,
            (Self::Open | Self::Locked, Self::Settled | Self::Returned) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Locked => write!(f, "Locked"),
            Self::Settled => write!(f, "Settled"),
            Self::Returned => write!(f, "Returned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_pool_state_can_transition_to() {
        assert!(PoolState::Open.can_transition_to(PoolState::Locked));
        assert!(PoolState::Open.can_transition_to(PoolState::Returned));
        assert!(PoolState::Locked.can_transition_to(PoolState::Settled));
        assert!(PoolState::Locked.can_transition_to(PoolState::Returned));

        assert!(!PoolState::Locked.can_transition_to(PoolState::Locked));
        assert!(!PoolState::Locked.can_transition_to(PoolState::Open));
        assert!(!PoolState::Settled.can_transition_to(PoolState::Returned));
        assert!(!PoolState::Returned.can_transition_to(PoolState::Open));
    }

    #[test]
    fn test_pool_state_is_live() {
        assert!(PoolState::Open.is_live());
        assert!(PoolState::Locked.is_live());
        assert!(PoolState::Settled.is_terminal());
        assert!(PoolState::Returned.is_terminal());
    }

    #[test]
    fn test_pool_state_display() {
        assert_eq!(PoolState::Locked.to_string(), "Locked");
        assert_eq!(PoolState::Returned.to_string(), "Returned");
    }

    #[test]
    fn test_pool_config_default_beats_immediately() {
        let config = PoolConfig::default();
        assert!(config.heartbeat.immediate);
        assert_eq!(config.heartbeat.interval, Duration::from_secs(10));
    }
}
