//! Render module: turns a laid-out tree into drawlist commands.
//!
//! This module contains:
//! - [`encode_frame`]: Preorder painter with a deferred overlay pass
//! - [`DamageTracker`]: Per-instance rect diff between frames
//! - [`Theme`]: Default styles filled in under node props
//! - [`DevWarning`]: Non-fatal hints routed to a [`WarningSink`]
//!
//! # Architecture
//!
//! ```text
//!   LayoutTree ──┬──▶ DamageTracker ──▶ Damage (skip frame when empty)
//!                │
//!                └──▶ encode_frame ──▶ DrawlistBuilder ──▶ bytes
//!                         │
//!                         └──▶ WarningSink (dev mode only)
//! ```

mod damage;
mod encode;
mod theme;
mod warnings;

pub use damage::{Damage, DamageTracker};
pub(crate) use damage::walk;
pub use encode::{encode_frame, EncodeStats, FrameContext};
pub use theme::Theme;
pub use warnings::{DevWarning, LogWarnings, WarningSink};
