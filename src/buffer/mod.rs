//! Buffer module: Per-frame scratch storage reused across frames.
//!
//! This module contains:
//! - [`TextArena`]: One contiguous byte buffer for all text of a frame
//! - [`ArrayPool`]: Bounded pool of scratch integer arrays used by layout
//!
//! Both are owned by the long-lived pipeline and handed to one pass at a
//! time, so pooled memory is never aliased across frames.

mod arena;
mod pool;

pub use arena::{TextArena, TextSlice};
pub use pool::{ArrayPool, PoolStats, DEFAULT_POOL_CAP};
