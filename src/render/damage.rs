//! Damage tracking between frames.
//!
//! The tracker remembers each instance's rect from the previous frame. An
//! instance contributes damage when it is new, was replaced, or moved;
//! instances that disappeared contribute their old rect. A frame with no
//! damage on an unchanged viewport can reuse the previous drawlist.

use std::collections::{HashMap, HashSet};

use crate::layout::{LayoutTree, Rect};
use crate::tree::{InstanceId, InstanceTree};

/// Regions that may have changed since the last frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Damage {
    /// Changed rects, old and new positions both included.
    pub rects: Vec<Rect>,
    /// The whole viewport must be repainted.
    pub full: bool,
}

impl Damage {
    /// Check if nothing needs repainting.
    pub fn is_empty(&self) -> bool {
        !self.full && self.rects.is_empty()
    }

    /// Smallest rect covering all damage.
    pub fn bounds(&self) -> Option<Rect> {
        self.rects.iter().copied().reduce(|acc, r| acc.union(&r))
    }
}

/// Per-instance rects of the previous frame.
#[derive(Debug, Default)]
pub struct DamageTracker {
    last: HashMap<InstanceId, Rect>,
    viewport: Option<Rect>,
}

impl DamageTracker {
    /// Empty tracker; the first frame is fully damaged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, forcing a full repaint next frame.
    pub fn invalidate(&mut self) {
        self.last.clear();
        self.viewport = None;
    }

    /// Number of instances tracked.
    pub fn tracked(&self) -> usize {
        self.last.len()
    }

    /// Compare this frame against the last and remember it.
    ///
    /// `layout` must have been computed for the tree rooted at `root`.
    pub fn update(
        &mut self,
        instances: &InstanceTree,
        root: InstanceId,
        layout: &LayoutTree<'_>,
        reused: &HashSet<InstanceId>,
        viewport: Rect,
    ) -> Damage {
        let mut next = HashMap::with_capacity(self.last.len());
        let mut rects = Vec::new();
        walk(instances, root, layout, &mut |id, rect| {
            next.insert(id, rect);
            match self.last.get(&id) {
                Some(old) if *old == rect && reused.contains(&id) => {}
                Some(old) => {
                    rects.push(*old);
                    rects.push(rect);
                }
                None => rects.push(rect),
            }
        });

        let mut gone: Vec<(InstanceId, Rect)> = self
            .last
            .iter()
            .filter(|(id, _)| !next.contains_key(*id))
            .map(|(id, rect)| (*id, *rect))
            .collect();
        gone.sort_unstable_by_key(|(id, _)| *id);
        rects.extend(gone.into_iter().map(|(_, rect)| rect));
        rects.retain(|r| !r.is_empty());

        let full = self.viewport != Some(viewport);
        self.viewport = Some(viewport);
        self.last = next;
        Damage { rects, full }
    }
}

/// Visit instance ids alongside their layout rects.
pub(crate) fn walk(
    instances: &InstanceTree,
    id: InstanceId,
    layout: &LayoutTree<'_>,
    f: &mut impl FnMut(InstanceId, Rect),
) {
    f(id, layout.rect);
    for (child, child_layout) in instances.children(id).iter().zip(&layout.children) {
        walk(instances, *child, child_layout, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{layout, Axis};
    use crate::tree::{commit, IgnoreEffects, VNode};

    fn frame(
        tracker: &mut DamageTracker,
        instances: &mut InstanceTree,
        node: &VNode,
    ) -> Damage {
        let outcome = commit(instances, node, &mut IgnoreEffects).unwrap();
        let tree = layout(node, 0, 0, 20, 5, Axis::Vertical).unwrap();
        tracker.update(instances, outcome.root, &tree, &outcome.reused_set(), Rect::from_size(20, 5))
    }

    #[test]
    fn test_first_frame_is_full() {
        let mut tracker = DamageTracker::new();
        let mut instances = InstanceTree::new();
        let damage = frame(&mut tracker, &mut instances, &VNode::text("a"));
        assert!(damage.full);
        assert_eq!(tracker.tracked(), 1);
    }

    #[test]
    fn test_unchanged_frame_has_no_damage() {
        let mut tracker = DamageTracker::new();
        let mut instances = InstanceTree::new();
        let node = VNode::column(vec![VNode::text("a"), VNode::text("b")]);
        frame(&mut tracker, &mut instances, &node);
        assert!(frame(&mut tracker, &mut instances, &node).is_empty());
    }

    #[test]
    fn test_changed_leaf_is_damaged() {
        let mut tracker = DamageTracker::new();
        let mut instances = InstanceTree::new();
        frame(&mut tracker, &mut instances, &VNode::column(vec![VNode::text("a"), VNode::text("b")]));
        let damage = frame(
            &mut tracker,
            &mut instances,
            &VNode::column(vec![VNode::text("a"), VNode::text("c")]),
        );
        assert!(!damage.full);
        // Old and new rect of the replaced text.
        assert_eq!(damage.rects, vec![Rect::new(0, 1, 20, 1), Rect::new(0, 1, 20, 1)]);
        assert_eq!(damage.bounds(), Some(Rect::new(0, 1, 20, 1)));
    }

    #[test]
    fn test_removed_node_damages_old_rect() {
        let mut tracker = DamageTracker::new();
        let mut instances = InstanceTree::new();
        frame(&mut tracker, &mut instances, &VNode::column(vec![VNode::text("a"), VNode::text("b")]));
        let damage = frame(&mut tracker, &mut instances, &VNode::column(vec![VNode::text("a")]));
        // The column shrank by one row and the second text is gone.
        assert!(damage.rects.contains(&Rect::new(0, 1, 20, 1)));
        assert!(damage.rects.contains(&Rect::new(0, 0, 20, 2)));
    }
}
