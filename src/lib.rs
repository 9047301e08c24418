//! # Weft
//!
//! A commit, layout and drawlist encoding pipeline for terminal UIs.
//!
//! Weft turns an immutable declarative tree into a validated binary draw
//! command buffer every frame. A terminal backend consumes the buffer; the
//! pipeline never writes escape sequences itself.
//!
//! ## Core Concepts
//!
//! - **Commit**: Reconcile a new [`VNode`] tree onto persistent instances,
//!   reusing per node and ancestor-independently
//! - **Layout**: Integer cell-grid box model with flex, wrapping, panel
//!   groups and anchored overlays, remeasuring wrapped text at its final width
//! - **Drawlist**: Versioned little-endian wire format with interned text,
//!   packed styles and a keyed blob table
//! - **Damage**: Frames with nothing changed are skipped entirely
//!
//! ## Example
//!
//! ```
//! use weft::{IgnoreEffects, Pipeline, PipelineConfig, VNode};
//!
//! let mut pipeline = Pipeline::new(PipelineConfig::default());
//! let tree = VNode::column(vec![
//!     VNode::text("Hello"),
//!     VNode::row(vec![VNode::button("Ok"), VNode::button("Cancel")]),
//! ]);
//! let outcome = pipeline.frame(&tree, 80, 24, &mut IgnoreEffects).unwrap();
//! let bytes = outcome.bytes().unwrap();
//! let parsed = weft::drawlist::parse(bytes).unwrap();
//! assert!(parsed.visible_text().contains(&"Hello".to_owned()));
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod buffer;
pub mod drawlist;
pub mod error;
pub mod layout;
pub mod render;
pub mod runtime;
pub mod text;
pub mod tree;

// Re-exports for convenience
pub use buffer::{ArrayPool, TextArena, TextSlice};
pub use drawlist::{Builder, DrawlistBuilder, DrawlistVersion, Rgb, TextStyle};
pub use error::{DrawlistError, DrawlistErrorCode, Fatal, FatalCode, FrameError};
pub use layout::{distribute_integer, layout, Axis, LayoutTree, Rect};
pub use render::{DevWarning, Theme, WarningSink};
pub use runtime::{FrameOutcome, FrameSubmitter, InputEvent, Pipeline, PipelineConfig};
pub use text::{text_width, TEXT_MEASURE_VERSION};
pub use tree::{commit, Effect, EffectSink, IgnoreEffects, InstanceId, InstanceTree, VNode};
