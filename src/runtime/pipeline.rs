//! The per-frame pipeline: commit, layout, damage, encode.
//!
//! A [`Pipeline`] is the single long-lived owner of every piece of state
//! that survives between frames: the instance tree, the layout scratch
//! pool, the drawlist builder and its blob cache, the damage tracker and
//! the hit map of the last laid-out frame.
//!
//! ```text
//!   VNode ──▶ commit ──▶ layout ──▶ damage ──┬─ empty ─▶ Unchanged
//!              │           │                 │
//!              ▼           ▼                 └─▶ encode ─▶ build ─▶ Encoded(bytes)
//!            Fatal       Fatal                                │
//!                                                             ▼
//!                                                       DrawlistError
//! ```
//!
//! Each stage short-circuits the rest of the frame on failure. A failed
//! commit leaves the instance tree untouched; a failed layout or build
//! keeps the last good hit map and forces a full repaint next frame.

use std::time::Instant;

use super::config::PipelineConfig;
use super::input::{InputEvent, KeyCode, MouseKind};
use crate::drawlist::{Builder, CursorState, DrawlistBuilder, DrawlistStats};
use crate::error::FrameError;
use crate::layout::{focus_targets, Axis, LayoutEngine, LayoutStats, LayoutTree, Rect};
use crate::render::{
    encode_frame, Damage, DamageTracker, EncodeStats, FrameContext, LogWarnings, WarningSink,
};
use crate::tree::{commit, EffectSink, Instance, InstanceId, InstanceTree, VNode};

/// What a successful frame produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome<'a> {
    /// A fresh drawlist for the backend.
    Encoded(&'a [u8]),
    /// Nothing changed; the previous drawlist is still current.
    Unchanged,
}

impl<'a> FrameOutcome<'a> {
    /// The encoded bytes, if any.
    pub const fn bytes(&self) -> Option<&'a [u8]> {
        match self {
            Self::Encoded(bytes) => Some(*bytes),
            Self::Unchanged => None,
        }
    }
}

/// Per-frame summary of the last successful frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, starting at one.
    pub frame: u64,
    /// Instances kept from the previous frame.
    pub reused: usize,
    /// Instances created.
    pub mounted: usize,
    /// Reused instances with refreshed props.
    pub updated: usize,
    /// Instances dropped.
    pub unmounted: usize,
    /// Damage computed for this frame.
    pub damage: Damage,
    /// Layout counters.
    pub layout: LayoutStats,
    /// Encoder counters, `None` when the frame was skipped.
    pub encode: Option<EncodeStats>,
    /// Drawlist size, zero when skipped.
    pub bytes: usize,
}

/// Lifetime counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames requested.
    pub frames: u64,
    /// Frames skipped for lack of damage.
    pub skipped: u64,
    /// Frames that failed in any stage.
    pub failed: u64,
    /// Last frame time in microseconds.
    pub last_frame_us: u64,
    /// Smoothed frame time in microseconds.
    pub avg_frame_us: u64,
}

/// Long-lived frame producer.
pub struct Pipeline {
    config: PipelineConfig,
    instances: InstanceTree,
    engine: LayoutEngine,
    builder: Builder,
    damage: DamageTracker,
    /// Clipped rects of focusable instances, in preorder.
    hit_map: Vec<(Rect, InstanceId)>,
    focused: Option<InstanceId>,
    cursor: Option<CursorState>,
    repaint: bool,
    warnings: Box<dyn WarningSink + Send>,
    stats: PipelineStats,
    last: Option<FrameReport>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("instances", &self.instances.len())
            .field("focused", &self.focused)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    /// Create a pipeline from `config`.
    pub fn new(config: PipelineConfig) -> Self {
        let builder = Builder::with_limits(config.drawlist_version, config.limits);
        Self {
            config,
            instances: InstanceTree::new(),
            engine: LayoutEngine::new(),
            builder,
            damage: DamageTracker::new(),
            hit_map: Vec::new(),
            focused: None,
            cursor: None,
            repaint: true,
            warnings: Box::new(LogWarnings),
            stats: PipelineStats::default(),
            last: None,
        }
    }

    /// Route developer warnings to `sink` as well as the log.
    pub fn set_warning_sink(&mut self, sink: impl WarningSink + Send + 'static) {
        self.warnings = Box::new(sink);
    }

    /// Configuration in effect.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The committed instance tree.
    pub const fn instances(&self) -> &InstanceTree {
        &self.instances
    }

    /// Look up one instance.
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    /// Lifetime counters.
    pub const fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Summary of the last successful frame.
    pub const fn last_report(&self) -> Option<&FrameReport> {
        self.last.as_ref()
    }

    /// Drawlist counters of the last encoded frame.
    pub fn drawlist_stats(&self) -> DrawlistStats {
        self.builder.stats()
    }

    /// Produce the next frame for `tree` in a `cols x rows` viewport.
    ///
    /// Effects from the commit are flushed to `effects` before layout runs.
    pub fn frame(
        &mut self,
        tree: &VNode,
        cols: i32,
        rows: i32,
        effects: &mut dyn EffectSink,
    ) -> Result<FrameOutcome<'_>, FrameError> {
        let start = Instant::now();
        self.stats.frames += 1;

        let outcome = match commit(&mut self.instances, tree, effects) {
            Ok(outcome) => outcome,
            Err(fatal) => {
                self.stats.failed += 1;
                tracing::warn!(error = %fatal, "commit failed, keeping previous tree");
                return Err(FrameError::Commit(fatal));
            }
        };

        let laid = match self.engine.layout(tree, 0, 0, cols, rows, Axis::Vertical) {
            Ok(laid) => laid,
            Err(fatal) => {
                self.stats.failed += 1;
                self.damage.invalidate();
                tracing::warn!(error = %fatal, "layout failed, keeping previous hit map");
                return Err(FrameError::Layout(fatal));
            }
        };

        self.rebuild_hit_map(outcome.root, &laid);
        if self.focused.is_some_and(|id| !self.hit_map.iter().any(|(_, f)| *f == id)) {
            self.focused = None;
            self.repaint = true;
        }

        let viewport = Rect::from_size(cols, rows);
        let damage = self.damage.update(
            &self.instances,
            outcome.root,
            &laid,
            &outcome.reused_set(),
            viewport,
        );
        let mut report = FrameReport {
            frame: self.stats.frames,
            reused: outcome.reused_instance_ids.len(),
            mounted: outcome.mounted,
            updated: outcome.updated,
            unmounted: outcome.unmounted,
            damage,
            layout: self.engine.stats(),
            encode: None,
            bytes: 0,
        };

        if report.damage.is_empty() && !self.repaint {
            self.stats.skipped += 1;
            tracing::debug!(frame = report.frame, "no damage, frame skipped");
            self.finish(start, report);
            return Ok(FrameOutcome::Unchanged);
        }

        self.builder.reset();
        let ctx = FrameContext {
            instances: &self.instances,
            root: Some(outcome.root),
            focused: self.focused,
            theme: &self.config.theme,
            viewport: (cols, rows),
            cursor: self.cursor,
            dev_mode: self.config.dev_mode,
        };
        report.encode = Some(encode_frame(
            &mut self.builder,
            &laid,
            &ctx,
            self.warnings.as_mut(),
        ));

        match self.builder.build().map(<[u8]>::len) {
            Ok(len) => report.bytes = len,
            Err(e) => {
                self.stats.failed += 1;
                self.damage.invalidate();
                tracing::warn!(error = %e, "drawlist build failed");
                return Err(e.into());
            }
        }
        self.repaint = false;
        self.finish(start, report);
        Ok(FrameOutcome::Encoded(self.builder.output()))
    }

    fn finish(&mut self, start: Instant, report: FrameReport) {
        self.stats.last_frame_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        // Smoothed average
        self.stats.avg_frame_us = if self.stats.avg_frame_us == 0 {
            self.stats.last_frame_us
        } else {
            (self.stats.avg_frame_us * 15 + self.stats.last_frame_us) / 16
        };
        tracing::debug!(
            frame = report.frame,
            reused = report.reused,
            mounted = report.mounted,
            unmounted = report.unmounted,
            bytes = report.bytes,
            us = self.stats.last_frame_us,
            "frame complete"
        );
        self.last = Some(report);
    }

    fn rebuild_hit_map(&mut self, root: InstanceId, laid: &LayoutTree<'_>) {
        let ids = self.instances.preorder(root);
        self.hit_map.clear();
        self.hit_map.extend(
            focus_targets(laid)
                .into_iter()
                .filter_map(|t| ids.get(t.index).map(|id| (t.rect, *id))),
        );
    }

    /// Topmost focusable instance under `(x, y)` in the last laid-out frame.
    pub fn hit_test(&self, x: i32, y: i32) -> Option<InstanceId> {
        self.hit_map
            .iter()
            .rev()
            .find(|(rect, _)| rect.contains(x, y))
            .map(|(_, id)| *id)
    }

    /// Focusable instances in traversal order.
    pub fn focus_order(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.hit_map.iter().map(|(_, id)| *id)
    }

    /// Currently focused instance.
    pub const fn focused(&self) -> Option<InstanceId> {
        self.focused
    }

    /// Focus `id`, or clear focus. Unknown ids clear focus.
    pub fn set_focus(&mut self, id: Option<InstanceId>) {
        let id = id.filter(|id| self.hit_map.iter().any(|(_, f)| f == id));
        if id != self.focused {
            self.focused = id;
            self.repaint = true;
        }
    }

    /// Move focus forward, wrapping around.
    pub fn focus_next(&mut self) -> Option<InstanceId> {
        self.step_focus(true)
    }

    /// Move focus backward, wrapping around.
    pub fn focus_prev(&mut self) -> Option<InstanceId> {
        self.step_focus(false)
    }

    fn step_focus(&mut self, forward: bool) -> Option<InstanceId> {
        let len = self.hit_map.len();
        if len == 0 {
            return None;
        }
        let current = self
            .focused
            .and_then(|id| self.hit_map.iter().position(|(_, f)| *f == id));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        let id = self.hit_map[next].1;
        self.set_focus(Some(id));
        Some(id)
    }

    /// Show the cursor at `cursor`, or hide it.
    pub fn set_cursor(&mut self, cursor: Option<CursorState>) {
        if cursor != self.cursor {
            self.cursor = cursor;
            self.repaint = true;
        }
    }

    /// Apply focus-related input and return the instance it targets.
    ///
    /// Mouse presses focus the instance under the pointer; Tab and
    /// Shift+Tab cycle focus. Other events are routed to the focused
    /// instance, or to the instance under the pointer for mouse events.
    pub fn handle_input(&mut self, event: &InputEvent) -> Option<InstanceId> {
        match event {
            InputEvent::Mouse(m) => {
                let target = self.hit_test(m.x, m.y);
                if matches!(m.kind, MouseKind::Down(_)) {
                    self.set_focus(target);
                }
                target
            }
            InputEvent::Key { code: KeyCode::Tab, .. } => self.focus_next(),
            InputEvent::Key { code: KeyCode::BackTab, .. } => self.focus_prev(),
            InputEvent::Resize { .. } => {
                self.repaint = true;
                None
            }
            _ => self.focused,
        }
    }

    /// Force the next frame to repaint everything.
    pub fn invalidate(&mut self) {
        self.damage.invalidate();
        self.repaint = true;
    }

    /// Drop every pooled buffer and cached resource.
    ///
    /// The instance tree survives; the next frame repaints fully.
    pub fn release(&mut self) {
        self.engine.release();
        self.builder.release();
        self.invalidate();
        tracing::debug!("pipeline resources released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawlist::{parse, DrawlistVersion};
    use crate::error::FatalCode;
    use crate::runtime::input::{KeyModifiers, MouseButton, MouseEvent};
    use crate::tree::{IgnoreEffects, TextProps};

    fn screen(label: &str) -> VNode {
        VNode::column(vec![
            VNode::text(label),
            VNode::row(vec![VNode::button("Ok"), VNode::button("Cancel")]),
        ])
    }

    #[test]
    fn test_frame_then_unchanged() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let bytes = pipeline
            .frame(&screen("hi"), 40, 10, &mut IgnoreEffects)
            .unwrap()
            .bytes()
            .map(<[u8]>::to_vec)
            .unwrap();
        assert!(parse(&bytes).unwrap().visible_text().contains(&"hi".to_owned()));

        let outcome = pipeline.frame(&screen("hi"), 40, 10, &mut IgnoreEffects).unwrap();
        assert_eq!(outcome, FrameOutcome::Unchanged);
        assert_eq!(pipeline.stats().skipped, 1);
        assert_eq!(pipeline.last_report().unwrap().reused, 5);
    }

    #[test]
    fn test_change_and_resize_repaint() {
        let mut pipeline = Pipeline::default();
        pipeline.frame(&screen("a"), 40, 10, &mut IgnoreEffects).unwrap();
        let outcome = pipeline.frame(&screen("b"), 40, 10, &mut IgnoreEffects).unwrap();
        assert!(outcome.bytes().is_some());
        let outcome = pipeline.frame(&screen("b"), 30, 10, &mut IgnoreEffects).unwrap();
        assert!(outcome.bytes().is_some());
        assert!(pipeline.last_report().unwrap().damage.full);
    }

    #[test]
    fn test_commit_failure_keeps_tree() {
        let mut pipeline = Pipeline::default();
        pipeline.frame(&screen("a"), 40, 10, &mut IgnoreEffects).unwrap();
        let before = pipeline.instances().len();
        let bad = VNode::new(TextProps::default()).with_children(vec![VNode::text("x")]);
        let err = pipeline.frame(&bad, 40, 10, &mut IgnoreEffects).unwrap_err();
        assert!(matches!(err, FrameError::Commit(ref f) if f.code == FatalCode::InvalidNesting));
        assert_eq!(pipeline.instances().len(), before);
        assert_eq!(pipeline.stats().failed, 1);
    }

    #[test]
    fn test_focus_cycles_and_repaints() {
        let mut pipeline = Pipeline::default();
        pipeline.frame(&screen("a"), 40, 10, &mut IgnoreEffects).unwrap();
        let order: Vec<_> = pipeline.focus_order().collect();
        assert_eq!(order.len(), 2);

        let tab = InputEvent::Key {
            code: KeyCode::Tab,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(pipeline.handle_input(&tab), Some(order[0]));
        assert_eq!(pipeline.handle_input(&tab), Some(order[1]));
        assert_eq!(pipeline.handle_input(&tab), Some(order[0]));
        assert_eq!(pipeline.focus_prev(), Some(order[1]));

        // Focus changes force a repaint of an otherwise unchanged tree.
        let outcome = pipeline.frame(&screen("a"), 40, 10, &mut IgnoreEffects).unwrap();
        assert!(outcome.bytes().is_some());
    }

    #[test]
    fn test_click_focuses_button() {
        let mut pipeline = Pipeline::default();
        pipeline.frame(&screen("a"), 40, 10, &mut IgnoreEffects).unwrap();
        let click = InputEvent::Mouse(MouseEvent {
            x: 1,
            y: 1,
            kind: MouseKind::Down(MouseButton::Left),
            modifiers: KeyModifiers::NONE,
        });
        let target = pipeline.handle_input(&click);
        assert!(target.is_some());
        assert_eq!(pipeline.focused(), target);
        assert_eq!(pipeline.hit_test(1, 5), None);
    }

    #[test]
    fn test_v1_target_skips_links() {
        let config = PipelineConfig::default().with_version(DrawlistVersion::V1);
        let mut pipeline = Pipeline::new(config);
        pipeline.set_cursor(Some(CursorState {
            x: 1,
            y: 1,
            visible: true,
            ..CursorState::default()
        }));
        let link = crate::drawlist::TextStyle {
            link: Some(crate::drawlist::Link {
                uri: "https://example.com".into(),
                id: None,
            }),
            ..crate::drawlist::TextStyle::default()
        };
        let tree = VNode::new(TextProps {
            content: "docs".into(),
            style: Some(link),
            ..TextProps::default()
        });
        // Links are skipped on V1; the frame still encodes.
        let outcome = pipeline.frame(&tree, 20, 2, &mut IgnoreEffects).unwrap();
        let parsed = parse(outcome.bytes().unwrap()).unwrap();
        assert_eq!(parsed.version, DrawlistVersion::V1);
        assert!(parsed.visible_text().contains(&"docs".to_owned()));
    }

    #[test]
    fn test_drawlist_limit_fails_frame() {
        let mut config = PipelineConfig::default();
        config.limits.max_cmds = 2;
        let mut pipeline = Pipeline::new(config);
        let err = pipeline.frame(&screen("a"), 40, 10, &mut IgnoreEffects).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Drawlist(ref e) if e.code == crate::error::DrawlistErrorCode::TooLarge
        ));

        // The failed frame is not remembered as painted.
        let err = pipeline.frame(&screen("a"), 40, 10, &mut IgnoreEffects).unwrap_err();
        assert!(matches!(err, FrameError::Drawlist(_)));
        assert_eq!(pipeline.stats().failed, 2);
    }
}
