//! Slip types: the registry's record of one player's participation.
//!
//! A "slip" is what the hypervisor hands a player when they join a match.
//! Locally we track:
//! - WHO the slip belongs to (`SlipToken`, also the bearer credential)
//! - WHAT state it's in (active or one of the three terminal states)
//! - WHETHER it is still heartbeating (the `HeartbeatTask` handle)

use std::fmt;

use arcade_heartbeat::{HeartbeatConfig, HeartbeatTask};
use arcade_protocol::{ActivateSlipResponse, SlipToken};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for slip behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Heartbeat schedule for active slips.
    ///
    /// Default: every 10 seconds, first beat one interval after
    /// activation.
    pub heartbeat: HeartbeatConfig,
    /// How many closed slips stay visible to
    /// [`SessionRegistry::slip`](crate::SessionRegistry::slip) after
    /// close-out. Older ones are forgotten. Default: 64.
    pub closed_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat: HeartbeatConfig::default(),
            closed_history: Self::DEFAULT_CLOSED_HISTORY,
        }
    }
}

impl SessionConfig {
    pub const DEFAULT_CLOSED_HISTORY: usize = 64;
}

// ---------------------------------------------------------------------------
// SlipState
// ---------------------------------------------------------------------------

/// Where a slip is in its lifecycle.
///
/// ```text
///                ┌──(settle)──────────→ Settled
///                │
///   Active ──────┼──(defeated by)─────→ DefeatedByOpponent
///                │
///                └──(self-defeat)─────→ SelfDefeated
/// ```
///
/// The three right-hand states are terminal. A slip that was never
/// activated has no record at all; that's the "inactive" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlipState {
    /// Activated and heartbeating.
    Active,
    /// Closed out successfully.
    Settled,
    /// Lost to another player.
    DefeatedByOpponent,
    /// Lost to the environment.
    SelfDefeated,
}

impl SlipState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for SlipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Settled => "settled",
            Self::DefeatedByOpponent => "defeated",
            Self::SelfDefeated => "self-defeated",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Slip
// ---------------------------------------------------------------------------

/// The registry's record for one active token.
///
/// Invariant: `heartbeat` is `Some` exactly when `state` is
/// [`SlipState::Active`]. Only [`SessionRegistry`](crate::SessionRegistry)
/// constructs and mutates these. Once closed, a slip is kept only as a
/// [`SlipInfo`] snapshot.
#[derive(Debug)]
pub(crate) struct Slip {
    pub(crate) state: SlipState,
    pub(crate) heartbeat: Option<HeartbeatTask>,
    /// What activation returned. `None` for a slip that was closed out
    /// without ever being activated through this registry.
    pub(crate) profile: Option<ActivateSlipResponse>,
    /// How many heartbeats the slip's task started before it stopped.
    pub(crate) beats: u64,
}

impl Slip {
    pub(crate) fn active(profile: ActivateSlipResponse, heartbeat: HeartbeatTask) -> Self {
        Self {
            state: SlipState::Active,
            heartbeat: Some(heartbeat),
            profile: Some(profile),
            beats: 0,
        }
    }

    pub(crate) fn closed(state: SlipState) -> Self {
        Self {
            state,
            heartbeat: None,
            profile: None,
            beats: 0,
        }
    }

    /// Moves to a terminal state and stops the heartbeat.
    ///
    /// Returns `true` if a running heartbeat was cancelled.
    pub(crate) fn close(&mut self, state: SlipState) -> bool {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.stop_heartbeat()
    }

    /// Cancels the heartbeat, if any, and freezes its beat count.
    pub(crate) fn stop_heartbeat(&mut self) -> bool {
        match self.heartbeat.take() {
            Some(task) => {
                self.beats = task.beats();
                task.cancel()
            }
            None => false,
        }
    }

    pub(crate) fn info(&self, token: &SlipToken) -> SlipInfo {
        SlipInfo {
            token: token.clone(),
            state: self.state,
            display_name: self.profile.as_ref().map(|p| p.display_name.clone()),
            player_id: self.profile.as_ref().and_then(|p| p.player_id.clone()),
            heartbeat_running: self.heartbeat.is_some(),
            heartbeat_beats: self
                .heartbeat
                .as_ref()
                .map_or(self.beats, HeartbeatTask::beats),
        }
    }
}

/// A read-only snapshot of one slip, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlipInfo {
    pub token: SlipToken,
    pub state: SlipState,
    pub display_name: Option<String>,
    pub player_id: Option<String>,
    /// Whether a heartbeat task is installed for this slip.
    pub heartbeat_running: bool,
    /// Heartbeats started so far (frozen once the slip closes).
    pub heartbeat_beats: u64,
}
