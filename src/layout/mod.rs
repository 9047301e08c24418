//! Layout module: VNode tree to integer cell rectangles.
//!
//! This module contains:
//! - [`Rect`]: Signed cell rectangle with overflow-checked construction
//! - [`Spacing`]: Padding/margin shorthand and its resolution to [`Edges`]
//! - [`distribute_integer`]: Exact proportional splitting of cells
//! - [`LayoutEngine`]: Measure, flex and arrange passes
//! - [`anchored_rect`]: Overlay placement next to an anchor
//! - [`hit_test`]: Pointer routing and focus order over a [`LayoutTree`]
//!
//! ```text
//! ┌──────────────── viewport ────────────────┐
//! │ column                                   │
//! │ ┌──────────────────────────────────────┐ │
//! │ │ row  [text ][ spacer (flex) ][button]│ │
//! │ └──────────────────────────────────────┘ │
//! │ ┌── panelGroup ────────────────────────┐ │
//! │ │ panel 30%   │ panel 70%              │ │
//! │ └──────────────────────────────────────┘ │
//! └──────────────────────────────────────────┘
//! ```

mod distribute;
mod engine;
mod hit_test;
mod overlay;
mod rect;
mod spacing;

pub use distribute::{distribute_integer, distribute_integer_into};
pub use engine::{
    layout, resolve_panel_sizes, Align, Axis, Justify, LayoutEngine, LayoutStats, LayoutTree, Size,
};
pub use hit_test::{focus_targets, hit_test, hit_test_index, HitTarget};
pub use overlay::{
    anchored_rect, dropdown_rect, dropdown_size, OverlayPosition, MIN_OVERLAY_SIDE,
    SCROLLBAR_GUTTER,
};
pub use rect::Rect;
pub use spacing::{Edges, SpaceScale, Spacing, SpacingValue};
