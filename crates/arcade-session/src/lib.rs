//! Slip lifecycle management for the Arcade SDK.
//!
//! This crate tracks the players ("slips") taking part in a match:
//!
//! 1. **Activation** — telling the hypervisor a player has joined and
//!    starting the slip's heartbeat ([`SessionRegistry::activate`])
//! 2. **Play** — forwarding score reports while the slip is active
//! 3. **Close-out** — settling or recording a defeat, which stops the
//!    heartbeat for good
//!
//! # How it fits in the stack
//!
//! ```text
//! SDK facade (above)  ← routes player calls here
//!     ↕
//! Session Layer (this crate)  ← slip state + one heartbeat per active slip
//!     ↕
//! Transport / Heartbeat (below)  ← one logical call, periodic tasks
//! ```

mod registry;
mod slip;

pub use registry::SessionRegistry;
pub use slip::{SessionConfig, SlipInfo, SlipState};
