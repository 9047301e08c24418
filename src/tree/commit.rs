//! Commit: reconcile a new VNode tree onto the instance tree.
//!
//! ```text
//! previous instances        next VNodes            result
//!   #1 box(none)              box(double)            #4 box(double)  fresh
//!   └─ #2 text "x"            └─ text "x"            └─ #2 text "x"  reused
//! ```
//!
//! Children are matched to the previous instance's children by key when
//! they have one, otherwise by index. A matched pair of the same kind is
//! then judged on its own: it is reused when its id and render-relevant
//! props are unchanged, whatever happened to its parent or children.
//!
//! The next tree is validated before anything is touched, so a failed
//! commit leaves the previous tree exactly as it was. Effects are queued
//! during the pass and handed to the sink only once the commit completes.

use std::collections::{HashMap, HashSet};

use super::instance::{HookSlots, Instance, InstanceId, InstanceTree};
use super::vnode::{NodeKind, VNode};
use crate::error::Fatal;

/// Lifecycle notification queued by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// A fresh instance was created.
    Mounted {
        /// New instance.
        id: InstanceId,
        /// Its kind.
        kind: NodeKind,
    },
    /// A reused instance received props that differ only in fields that do
    /// not affect rendering.
    Updated {
        /// Reused instance.
        id: InstanceId,
        /// Its kind.
        kind: NodeKind,
    },
    /// An instance became unreachable and was dropped.
    Unmounted {
        /// Dropped instance.
        id: InstanceId,
        /// Its kind.
        kind: NodeKind,
    },
}

impl Effect {
    /// Instance the effect is about.
    pub const fn id(&self) -> InstanceId {
        match *self {
            Self::Mounted { id, .. } | Self::Updated { id, .. } | Self::Unmounted { id, .. } => id,
        }
    }
}

/// Receiver of commit effects.
pub trait EffectSink {
    /// Called once per effect, in registration order.
    fn effect(&mut self, effect: Effect);
}

impl<F: FnMut(Effect)> EffectSink for F {
    fn effect(&mut self, effect: Effect) {
        self(effect);
    }
}

/// Sink that drops every effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreEffects;

impl EffectSink for IgnoreEffects {
    fn effect(&mut self, _effect: Effect) {}
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// New root.
    pub root: InstanceId,
    /// Instances kept from the previous tree, in preorder.
    pub reused_instance_ids: Vec<InstanceId>,
    /// Fresh instances created.
    pub mounted: usize,
    /// Reused instances whose stored props were refreshed.
    pub updated: usize,
    /// Instances dropped.
    pub unmounted: usize,
}

impl CommitOutcome {
    /// Reused ids as a set, for damage tracking.
    pub fn reused_set(&self) -> HashSet<InstanceId> {
        self.reused_instance_ids.iter().copied().collect()
    }
}

struct Pass<'t> {
    tree: &'t mut InstanceTree,
    reused: Vec<InstanceId>,
    effects: Vec<Effect>,
}

/// Commit `next` onto `tree`.
///
/// On success `tree.root()` is the new root, instances no longer reachable
/// are dropped with their hook state, and all queued effects have been
/// delivered to `sink`. On failure nothing is changed and no effect is
/// delivered.
pub fn commit(
    tree: &mut InstanceTree,
    next: &VNode,
    sink: &mut dyn EffectSink,
) -> Result<CommitOutcome, Fatal> {
    next.validate()?;

    let previous = tree.root;
    let old_order = previous.map(|root| tree.preorder(root)).unwrap_or_default();
    let mut pass = Pass {
        tree,
        reused: Vec::new(),
        effects: Vec::new(),
    };
    let root = pass.reconcile(previous, next);
    let Pass {
        tree,
        reused,
        mut effects,
    } = pass;
    tree.root = Some(root);

    let live: HashSet<InstanceId> = tree.preorder(root).into_iter().collect();
    let mut unmounted = 0;
    for id in old_order {
        if live.contains(&id) {
            continue;
        }
        if let Some(instance) = tree.slab.remove(&id) {
            effects.push(Effect::Unmounted {
                id,
                kind: instance.kind(),
            });
            unmounted += 1;
        }
    }

    let mounted = effects
        .iter()
        .filter(|e| matches!(e, Effect::Mounted { .. }))
        .count();
    let updated = effects
        .iter()
        .filter(|e| matches!(e, Effect::Updated { .. }))
        .count();
    tracing::debug!(
        root = %root,
        reused = reused.len(),
        mounted,
        updated,
        unmounted,
        live = tree.len(),
        "commit complete"
    );

    for effect in effects {
        sink.effect(effect);
    }
    Ok(CommitOutcome {
        root,
        reused_instance_ids: reused,
        mounted,
        updated,
        unmounted,
    })
}

impl Pass<'_> {
    fn reconcile(&mut self, previous: Option<InstanceId>, node: &VNode) -> InstanceId {
        let kind = node.kind();
        let previous = previous.filter(|id| {
            self.tree
                .slab
                .get(id)
                .is_some_and(|old| old.kind() == kind)
        });

        let mut refresh = false;
        let reused = previous.filter(|id| {
            self.tree.slab.get(id).is_some_and(|old| {
                let keep = old.node_id.as_deref() == node.id.as_deref()
                    && old.props.reuse_eq(&node.props);
                refresh = keep && old.props != node.props;
                keep
            })
        });

        let id = match reused {
            Some(id) => {
                self.reused.push(id);
                if refresh {
                    self.effects.push(Effect::Updated { id, kind });
                }
                id
            }
            None => {
                let id = self.tree.ids.next_id();
                self.effects.push(Effect::Mounted { id, kind });
                id
            }
        };

        let old_children = previous.map_or_else(Vec::new, |p| self.tree.children(p).to_vec());
        let matched = self.match_children(&old_children, &node.children);
        let children: Vec<InstanceId> = node
            .children
            .iter()
            .zip(matched)
            .map(|(child, previous)| self.reconcile(previous, child))
            .collect();
        let children_dirty = children
            .iter()
            .any(|child| self.tree.slab.get(child).is_some_and(|c| c.dirty));

        if reused.is_some() {
            if let Some(instance) = self.tree.slab.get_mut(&id) {
                if refresh {
                    instance.props = node.props.clone();
                }
                instance.key.clone_from(&node.key);
                instance.children = children;
                instance.self_dirty = false;
                instance.dirty = children_dirty;
            }
        } else {
            self.tree.slab.insert(
                id,
                Instance {
                    id,
                    props: node.props.clone(),
                    node_id: node.id.clone(),
                    key: node.key.clone(),
                    children,
                    self_dirty: true,
                    dirty: true,
                    hooks: HookSlots::default(),
                },
            );
        }
        id
    }

    /// Pair each new child with a previous child: by key when keyed,
    /// otherwise the keyless previous child at the same index.
    fn match_children(&self, old: &[InstanceId], new: &[VNode]) -> Vec<Option<InstanceId>> {
        let mut keyed: HashMap<&str, InstanceId> = HashMap::new();
        for id in old {
            if let Some(key) = self.tree.slab.get(id).and_then(|i| i.key.as_deref()) {
                keyed.entry(key).or_insert(*id);
            }
        }
        new.iter()
            .enumerate()
            .map(|(index, child)| match child.key.as_deref() {
                Some(key) => keyed.remove(key),
                None => old.get(index).copied().filter(|id| {
                    self.tree
                        .slab
                        .get(id)
                        .is_some_and(|instance| instance.key.is_none())
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FatalCode;
    use crate::text::TextOverflow;
    use crate::tree::{Border, BoxProps, ButtonProps, Props, TextProps};

    fn run(tree: &mut InstanceTree, node: &VNode) -> (CommitOutcome, Vec<Effect>) {
        let mut effects = Vec::new();
        let outcome = commit(tree, node, &mut |e: Effect| effects.push(e)).unwrap();
        (outcome, effects)
    }

    fn boxed(border: Border, children: Vec<VNode>) -> VNode {
        VNode::boxed(
            BoxProps {
                border,
                ..BoxProps::default()
            },
            children,
        )
    }

    #[test]
    fn test_text_overflow_change_replaces_leaf() {
        let mut tree = InstanceTree::new();
        let (first, _) = run(&mut tree, &VNode::text("hello"));
        let ellipsis = VNode::new(TextProps {
            content: "hello".into(),
            overflow: TextOverflow::Ellipsis,
            ..TextProps::default()
        });
        let (second, effects) = run(&mut tree, &ellipsis);
        assert_ne!(first.root, second.root);
        assert!(!tree.contains(first.root));
        let Props::Text(props) = tree.get(second.root).unwrap().props() else {
            panic!("root is not text");
        };
        assert_eq!(props.overflow, TextOverflow::Ellipsis);
        assert_eq!(
            effects,
            vec![
                Effect::Mounted { id: second.root, kind: NodeKind::Text },
                Effect::Unmounted { id: first.root, kind: NodeKind::Text },
            ]
        );
    }

    #[test]
    fn test_container_change_keeps_unchanged_child() {
        let mut tree = InstanceTree::new();
        let (first, _) = run(&mut tree, &boxed(Border::None, vec![VNode::text("x")]));
        let child = tree.children(first.root)[0];

        let (second, _) = run(&mut tree, &boxed(Border::Double, vec![VNode::text("x")]));
        assert_ne!(first.root, second.root);
        assert_eq!(tree.children(second.root), &[child]);
        assert_eq!(second.reused_instance_ids, vec![child]);
        assert!(!tree.get(child).unwrap().is_self_dirty());
    }

    #[test]
    fn test_identical_tree_reuses_everything() {
        let node = VNode::column(vec![VNode::text("a"), VNode::row(vec![VNode::button("b")])]);
        let mut tree = InstanceTree::new();
        let (first, effects) = run(&mut tree, &node);
        assert_eq!(first.mounted, 4);
        assert_eq!(effects.len(), 4);

        let (second, effects) = run(&mut tree, &node);
        assert_eq!(second.root, first.root);
        assert_eq!(second.reused_instance_ids, tree.preorder(second.root));
        assert_eq!(second.mounted + second.unmounted, 0);
        assert!(effects.is_empty());
        assert!(!tree.get(second.root).unwrap().is_dirty());
    }

    #[test]
    fn test_failed_commit_leaves_tree_untouched() {
        let mut tree = InstanceTree::new();
        let (first, _) = run(&mut tree, &VNode::column(vec![VNode::text("a")]));
        let allocated = tree.allocated();

        let bad = VNode::column(vec![VNode::text("a").with_children(vec![VNode::text("b")])]);
        let mut effects = Vec::new();
        let err = commit(&mut tree, &bad, &mut |e: Effect| effects.push(e)).unwrap_err();
        assert_eq!(err.code, FatalCode::InvalidNesting);
        assert_eq!(tree.root(), Some(first.root));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.allocated(), allocated);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_keyed_children_follow_their_key() {
        let mut tree = InstanceTree::new();
        let items = |order: &[&str]| {
            VNode::column(order.iter().map(|k| VNode::text(*k).with_key(*k)).collect())
        };
        let (first, _) = run(&mut tree, &items(&["a", "b", "c"]));
        let before = tree.children(first.root).to_vec();

        let (second, _) = run(&mut tree, &items(&["c", "a"]));
        assert_eq!(tree.children(second.root), &[before[2], before[0]]);
        assert_eq!(second.unmounted, 1);
        assert!(!tree.contains(before[1]));
    }

    #[test]
    fn test_positional_match_needs_same_kind() {
        let mut tree = InstanceTree::new();
        run(&mut tree, &VNode::column(vec![VNode::text("a"), VNode::text("b")]));
        let (second, effects) = run(&mut tree, &VNode::column(vec![VNode::button("a"), VNode::text("b")]));
        assert_eq!(second.reused_instance_ids.len(), 2);
        assert_eq!(second.mounted, 1);
        assert!(matches!(effects[0], Effect::Mounted { kind: NodeKind::Button, .. }));
        assert!(matches!(effects[1], Effect::Unmounted { kind: NodeKind::Text, .. }));
    }

    #[test]
    fn test_inert_prop_change_updates_in_place() {
        let button = |action: &str| {
            VNode::new(ButtonProps {
                label: "ok".into(),
                action: Some(action.into()),
                ..ButtonProps::default()
            })
        };
        let mut tree = InstanceTree::new();
        let (first, _) = run(&mut tree, &button("save"));
        let (second, effects) = run(&mut tree, &button("submit"));
        assert_eq!(first.root, second.root);
        assert_eq!(effects, vec![Effect::Updated { id: first.root, kind: NodeKind::Button }]);
        let Props::Button(props) = tree.get(first.root).unwrap().props() else {
            panic!("root is not a button");
        };
        assert_eq!(props.action.as_deref(), Some("submit"));
    }

    #[test]
    fn test_hooks_survive_reuse_only() {
        let mut tree = InstanceTree::new();
        let (first, _) = run(&mut tree, &VNode::text("a"));
        *tree.get_mut(first.root).unwrap().hooks_mut().slot(0, || 0u8) = 7;

        run(&mut tree, &VNode::text("a"));
        assert_eq!(tree.get(first.root).unwrap().hooks().get::<u8>(0), Some(&7));

        let (third, _) = run(&mut tree, &VNode::text("b"));
        assert!(tree.get(third.root).unwrap().hooks().is_empty());
    }

    #[test]
    fn test_dirty_propagates_to_reused_ancestors() {
        let mut tree = InstanceTree::new();
        run(&mut tree, &VNode::column(vec![VNode::text("a")]));
        let (second, _) = run(&mut tree, &VNode::column(vec![VNode::text("a"), VNode::text("b")]));
        let root = tree.get(second.root).unwrap();
        assert!(!root.is_self_dirty());
        assert!(root.is_dirty());
    }

    #[test]
    fn test_id_change_replaces() {
        let mut tree = InstanceTree::new();
        let (first, _) = run(&mut tree, &VNode::text("a").with_id("one"));
        let (second, _) = run(&mut tree, &VNode::text("a").with_id("two"));
        assert_ne!(first.root, second.root);
        assert_eq!(tree.get(second.root).unwrap().node_id(), Some("two"));
    }
}
