//! Host-independent input: logical actions and per-frame snapshots.
//!
//! # Invariants
//! - The scene consumes `InputSnapshot`s, never raw window events.
//! - Mouse delta is per frame; held actions persist until released.

pub mod action;
pub mod state;

pub use action::Action;
pub use state::{InputSnapshot, InputState};
