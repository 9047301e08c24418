//! Instance arena: the persistent, core-owned counterpart of the VNode tree.
//!
//! Instances live in a slab keyed by [`InstanceId`]. Parent to child links
//! are ids, so dropping an unreachable subtree is a sweep over ids rather
//! than an ownership question.
//!
//! ```text
//!   InstanceTree
//!   ┌──────────────────────────────────────┐
//!   │ root: #4                             │
//!   │ slab: #4 box  ──children──▶ [#2, #5] │
//!   │       #2 text (reused)               │
//!   │       #5 button (fresh)              │
//!   └──────────────────────────────────────┘
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use super::vnode::{NodeKind, Props};

/// Stable instance identity, allocated monotonically and never reused while
/// the tree lives.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Raw value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source. Ids start at 1.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    /// Allocate the next id.
    #[inline]
    pub fn next_id(&mut self) -> InstanceId {
        self.last += 1;
        InstanceId(self.last)
    }

    /// Number of ids handed out so far.
    pub const fn allocated(&self) -> u64 {
        self.last
    }
}

struct Vacant;

/// Per-instance persistent state slots.
///
/// A slot survives as long as its instance is reused and is dropped with
/// the instance when it is replaced or unmounted.
#[derive(Default)]
pub struct HookSlots {
    slots: Vec<Box<dyn Any + Send>>,
}

impl fmt::Debug for HookSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSlots").field("len", &self.slots.len()).finish()
    }
}

impl HookSlots {
    /// State at `index`, initialized with `init` when empty or when it holds
    /// another type.
    pub fn slot<T: Any + Send>(&mut self, index: usize, init: impl FnOnce() -> T) -> &mut T {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || Box::new(Vacant));
        }
        let slot = &mut self.slots[index];
        if !slot.is::<T>() {
            *slot = Box::new(init());
        }
        match slot.downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("hook slot {index} was just set"),
        }
    }

    /// State at `index` if it holds a `T`.
    pub fn get<T: Any + Send>(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(|slot| slot.downcast_ref::<T>())
    }

    /// Number of slots, including vacant ones.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no slot was ever used.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One live instance.
#[derive(Debug)]
pub struct Instance {
    pub(crate) id: InstanceId,
    pub(crate) props: Props,
    pub(crate) node_id: Option<String>,
    pub(crate) key: Option<String>,
    pub(crate) children: Vec<InstanceId>,
    pub(crate) self_dirty: bool,
    pub(crate) dirty: bool,
    pub(crate) hooks: HookSlots,
}

impl Instance {
    /// Stable id.
    #[inline]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Kind of the VNode this instance represents.
    #[inline]
    pub const fn kind(&self) -> NodeKind {
        self.props.kind()
    }

    /// Props as of the latest commit.
    pub const fn props(&self) -> &Props {
        &self.props
    }

    /// VNode `id`, if any.
    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    /// VNode `key`, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Children in order.
    pub fn children(&self) -> &[InstanceId] {
        &self.children
    }

    /// Whether this instance was created by the latest commit.
    pub const fn is_self_dirty(&self) -> bool {
        self.self_dirty
    }

    /// Whether this instance or any descendant was created by the latest
    /// commit.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Hook state.
    pub const fn hooks(&self) -> &HookSlots {
        &self.hooks
    }

    /// Mutable hook state.
    pub fn hooks_mut(&mut self) -> &mut HookSlots {
        &mut self.hooks
    }
}

/// Slab of instances plus the current root and the id allocator.
#[derive(Debug, Default)]
pub struct InstanceTree {
    pub(crate) slab: HashMap<InstanceId, Instance>,
    pub(crate) root: Option<InstanceId>,
    pub(crate) ids: IdAllocator,
}

impl InstanceTree {
    /// Empty tree; the first commit mounts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Root of the latest successful commit.
    pub const fn root(&self) -> Option<InstanceId> {
        self.root
    }

    /// Look up an instance.
    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.slab.get(&id)
    }

    /// Look up an instance mutably (hook state).
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.slab.get_mut(&id)
    }

    /// Check if `id` is live.
    pub fn contains(&self, id: InstanceId) -> bool {
        self.slab.contains_key(&id)
    }

    /// Live instance count.
    pub fn len(&self) -> usize {
        self.slab.len()
    }

    /// Check if nothing is mounted.
    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    /// Ids allocated since creation.
    pub const fn allocated(&self) -> u64 {
        self.ids.allocated()
    }

    /// Children of `id`, empty when unknown.
    pub fn children(&self, id: InstanceId) -> &[InstanceId] {
        self.slab.get(&id).map_or(&[][..], |instance| instance.children.as_slice())
    }

    /// Ids under `root` in preorder.
    pub fn preorder(&self, root: InstanceId) -> Vec<InstanceId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(instance) = self.slab.get(&id) {
                out.push(id);
                stack.extend(instance.children.iter().rev());
            }
        }
        out
    }

    /// Drop every instance.
    pub fn clear(&mut self) {
        self.slab.clear();
        self.root = None;
    }
}
