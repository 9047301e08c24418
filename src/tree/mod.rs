//! Tree module: declarative input and its persistent instance counterpart.
//!
//! This module contains:
//! - [`VNode`]: Immutable per-frame tree with closed, per-kind props
//! - [`InstanceTree`]: Slab of [`Instance`]s keyed by stable [`InstanceId`]
//! - [`commit`]: Reconciler mapping a new VNode tree onto the instances
//!
//! # Architecture
//!
//! ```text
//!   VNode tree ──▶ validate ──▶ reconcile ──▶ sweep ──▶ flush effects
//!   (frame N)         │          (reuse or      (drop
//!                     │           replace)       unreachable)
//!                     ▼
//!              Fatal, previous tree untouched
//! ```

mod commit;
mod instance;
mod vnode;

pub use commit::{commit, CommitOutcome, Effect, EffectSink, IgnoreEffects};
pub use instance::{HookSlots, IdAllocator, Instance, InstanceId, InstanceTree};
pub use vnode::{
    Border, BoxProps, ButtonProps, CanvasProps, DropdownItem, DropdownProps, ImageProps,
    LayersProps, LayoutProps, NodeKind, PanelGroupProps, PanelProps, Props, RichSpan,
    RichTextProps, SpacerProps, StackProps, TextProps, VNode,
};
