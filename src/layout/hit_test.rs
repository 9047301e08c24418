//! Pointer hit testing and focus order over a laid-out tree.
//!
//! Nodes are visited in preorder with a running clip: a child is only
//! reachable inside the intersection of its ancestors' rects. Overlays
//! are clipped to their own rect, since they are drawn above everything.
//! The last focusable node containing the point wins, which is the one
//! drawn on top.

use super::engine::LayoutTree;
use super::rect::Rect;
use crate::tree::Props;

/// A focusable node and the part of it that can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTarget {
    /// Rect after clipping to ancestors.
    pub rect: Rect,
    /// Preorder index of the node in the layout tree.
    pub index: usize,
}

fn visit<'t, 'a>(
    tree: &'t LayoutTree<'a>,
    clip: Rect,
    index: &mut usize,
    f: &mut impl FnMut(&'t LayoutTree<'a>, Rect, usize),
) {
    let own = *index;
    *index += 1;
    let clip = if matches!(tree.node.props, Props::Dropdown(_)) {
        tree.rect
    } else {
        clip.intersection(&tree.rect)
    };
    f(tree, clip, own);
    for child in &tree.children {
        visit(child, clip, index, f);
    }
}

/// Topmost focusable node under `(x, y)`.
pub fn hit_test<'t, 'a>(tree: &'t LayoutTree<'a>, x: i32, y: i32) -> Option<&'t LayoutTree<'a>> {
    let mut hit = None;
    let mut index = 0;
    visit(tree, tree.rect, &mut index, &mut |node, clip, _| {
        if node.node.is_focusable() && clip.contains(x, y) {
            hit = Some(node);
        }
    });
    hit
}

/// Preorder index of the topmost focusable node under `(x, y)`.
pub fn hit_test_index(tree: &LayoutTree<'_>, x: i32, y: i32) -> Option<usize> {
    let mut hit = None;
    let mut index = 0;
    visit(tree, tree.rect, &mut index, &mut |node, clip, i| {
        if node.node.is_focusable() && clip.contains(x, y) {
            hit = Some(i);
        }
    });
    hit
}

/// Focusable nodes with a visible area, in preorder (tab order).
pub fn focus_targets(tree: &LayoutTree<'_>) -> Vec<HitTarget> {
    let mut targets = Vec::new();
    let mut index = 0;
    visit(tree, tree.rect, &mut index, &mut |node, clip, i| {
        if node.node.is_focusable() && !clip.is_empty() {
            targets.push(HitTarget { rect: clip, index: i });
        }
    });
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{layout, Axis, Size};
    use crate::tree::{ButtonProps, LayoutProps, VNode};

    fn fixed_button(label: &str, w: i32) -> VNode {
        VNode::new(ButtonProps {
            label: label.into(),
            layout: LayoutProps {
                width: Size::Cells(w),
                ..LayoutProps::DEFAULT
            },
            ..ButtonProps::default()
        })
    }

    #[test]
    fn test_hit_button_in_row() {
        let node = VNode::row(vec![fixed_button("a", 4).with_id("a"), fixed_button("b", 4).with_id("b")]);
        let tree = layout(&node, 0, 0, 20, 1, Axis::Vertical).unwrap();
        let hit = hit_test(&tree, 5, 0).unwrap();
        assert_eq!(hit.node.id.as_deref(), Some("b"));
        assert_eq!(hit_test_index(&tree, 1, 0), Some(1));
        assert!(hit_test(&tree, 15, 0).is_none());
    }

    #[test]
    fn test_clipped_child_not_hit() {
        // The second button overflows the 6-cell row and is clipped away.
        let node = VNode::new(crate::tree::Props::Row(crate::tree::StackProps {
            layout: LayoutProps {
                width: Size::Cells(6),
                ..LayoutProps::DEFAULT
            },
            ..Default::default()
        }))
        .with_children(vec![
            VNode::new(ButtonProps {
                label: "wide".into(),
                layout: LayoutProps {
                    width: Size::Cells(6),
                    flex_shrink: 0.0,
                    ..LayoutProps::DEFAULT
                },
                ..ButtonProps::default()
            }),
            VNode::new(ButtonProps {
                label: "x".into(),
                layout: LayoutProps {
                    width: Size::Cells(4),
                    flex_shrink: 0.0,
                    ..LayoutProps::DEFAULT
                },
                ..ButtonProps::default()
            }),
        ]);
        let tree = layout(&node, 0, 0, 20, 1, Axis::Vertical).unwrap();
        assert_eq!(tree.children[1].rect.x, 6);
        assert!(hit_test(&tree, 7, 0).is_none());
        assert_eq!(focus_targets(&tree).len(), 1);
    }

    #[test]
    fn test_disabled_is_not_focusable() {
        let node = VNode::row(vec![
            VNode::new(ButtonProps {
                label: "off".into(),
                disabled: true,
                ..ButtonProps::default()
            }),
            VNode::button("on"),
        ]);
        let tree = layout(&node, 0, 0, 20, 1, Axis::Vertical).unwrap();
        let targets = focus_targets(&tree);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].index, 2);
        assert!(hit_test(&tree, 0, 0).is_none());
    }

    #[test]
    fn test_later_overlapping_sibling_wins() {
        let node = VNode::layers(vec![
            VNode::button("under").with_id("under"),
            VNode::button("over").with_id("over"),
        ]);
        let tree = layout(&node, 0, 0, 10, 3, Axis::Vertical).unwrap();
        assert_eq!(tree.children[0].rect, tree.children[1].rect);
        let hit = hit_test(&tree, 2, 0).unwrap();
        assert_eq!(hit.node.id.as_deref(), Some("over"));
    }
}
