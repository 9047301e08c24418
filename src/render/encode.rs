//! Encoder: paints a committed, laid-out tree into a drawlist builder.
//!
//! ```text
//! clear_to(viewport)
//!   └─ preorder walk
//!        box      fill, border, title, clip, children
//!        text     wrapped or truncated lines
//!        button   fill + centered label
//!        richText one text-run blob
//!        canvas   keyed blob + DRAW_CANVAS
//!        image    keyed blob + DRAW_IMAGE
//!        dropdown deferred
//!   └─ dropdowns, above everything, unclipped
//! cursor
//! ```
//!
//! Encoding never fails by itself. Invalid operations are recorded by the
//! builder and reported by its `build`.

use std::borrow::Cow;

use super::theme::Theme;
use super::warnings::{emit, DevWarning, WarningSink};
use crate::drawlist::{
    merge_styles, CursorState, DrawlistBuilder, ImageParams, Opcode, TextRunSegment, TextStyle,
};
use crate::layout::{LayoutTree, Rect};
use crate::text::{text_width, truncate, wrap, TextOverflow};
use crate::tree::{
    Border, BoxProps, ButtonProps, CanvasProps, DropdownProps, ImageProps, InstanceId,
    InstanceTree, NodeKind, Props, RichTextProps, TextProps,
};

/// Everything the encoder reads besides the layout.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'f> {
    /// Instances matching the layout tree node for node.
    pub instances: &'f InstanceTree,
    /// Root instance of the layout tree.
    pub root: Option<InstanceId>,
    /// Instance drawn with the focus style.
    pub focused: Option<InstanceId>,
    /// Default styles.
    pub theme: &'f Theme,
    /// Columns and rows to clear.
    pub viewport: (i32, i32),
    /// Cursor to show, hidden when `None`.
    pub cursor: Option<CursorState>,
    /// Whether to emit developer warnings.
    pub dev_mode: bool,
}

/// Counters for one encoded frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Nodes visited.
    pub nodes: usize,
    /// Text lines drawn.
    pub lines: usize,
    /// Clips pushed for overflowing children.
    pub clips: usize,
    /// Dropdowns drawn in the overlay pass.
    pub overlays: usize,
    /// Developer warnings emitted.
    pub warnings: usize,
}

struct Painter<'p, 'f> {
    builder: &'p mut dyn DrawlistBuilder,
    ctx: &'p FrameContext<'f>,
    warnings: &'p mut dyn WarningSink,
    stats: EncodeStats,
}

/// Paint `layout` into `builder`.
///
/// The builder is expected to be freshly reset; the frame starts with a
/// clear to the viewport.
pub fn encode_frame(
    builder: &mut dyn DrawlistBuilder,
    layout: &LayoutTree<'_>,
    ctx: &FrameContext<'_>,
    warnings: &mut dyn WarningSink,
) -> EncodeStats {
    let (cols, rows) = ctx.viewport;
    builder.clear_to(cols, rows, &ctx.theme.base);

    let mut painter = Painter {
        builder,
        ctx,
        warnings,
        stats: EncodeStats::default(),
    };
    let mut overlays = Vec::new();
    painter.node(layout, ctx.root, &mut overlays);
    for (tree, id) in overlays {
        painter.overlay(tree, id);
    }
    match ctx.cursor {
        Some(cursor) => painter.builder.set_cursor(cursor),
        None => painter.builder.hide_cursor(),
    }

    let stats = painter.stats;
    tracing::debug!(
        nodes = stats.nodes,
        lines = stats.lines,
        clips = stats.clips,
        overlays = stats.overlays,
        "frame encoded"
    );
    stats
}

fn border_glyphs(border: Border) -> Option<[&'static str; 6]> {
    // top-left, top-right, bottom-left, bottom-right, horizontal, vertical
    match border {
        Border::None => None,
        Border::Single => Some(["┌", "┐", "└", "┘", "─", "│"]),
        Border::Double => Some(["╔", "╗", "╚", "╝", "═", "║"]),
        Border::Rounded => Some(["╭", "╮", "╰", "╯", "─", "│"]),
        Border::Heavy => Some(["┏", "┓", "┗", "┛", "━", "┃"]),
    }
}

fn cells(n: i32) -> usize {
    usize::try_from(n).unwrap_or(0)
}

impl<'p, 'f> Painter<'p, 'f> {
    fn warn(&mut self, warning: DevWarning) {
        if self.ctx.dev_mode {
            self.stats.warnings += 1;
            emit(self.warnings, &warning);
        }
    }

    fn supports(&self, op: Opcode) -> bool {
        self.builder.version().supports(op)
    }

    fn node<'t, 'a>(
        &mut self,
        tree: &'t LayoutTree<'a>,
        id: Option<InstanceId>,
        overlays: &mut Vec<(&'t LayoutTree<'a>, Option<InstanceId>)>,
    ) {
        self.stats.nodes += 1;
        let rect = tree.rect;
        let node = tree.node;
        if rect.is_empty() && (node.kind().is_leaf() || matches!(node.props, Props::Box(_))) {
            let paints = match &node.props {
                Props::Text(p) => !p.content.is_empty(),
                Props::Button(_) | Props::Canvas(_) | Props::Image(_) | Props::Box(_) => true,
                Props::RichText(p) => p.spans.iter().any(|s| !s.text.is_empty()),
                _ => false,
            };
            if paints {
                self.warn(DevWarning::ZeroSize { kind: node.kind(), instance: id });
            }
            if matches!(node.props, Props::Box(_)) {
                self.collect_overlays(tree, id, overlays);
            }
            if !matches!(node.props, Props::Dropdown(_)) {
                return;
            }
        }

        let inner = match &node.props {
            Props::Box(p) => self.boxed(p, rect, id),
            Props::Row(p) | Props::Column(p) => {
                if let Some(fill) = &p.style {
                    self.builder.fill_rect(rect, fill);
                }
                rect
            }
            Props::Text(p) => {
                self.text(p, rect);
                return;
            }
            Props::Button(p) => {
                self.button(p, rect, id);
                return;
            }
            Props::RichText(p) => {
                self.rich_text(p, rect);
                return;
            }
            Props::Canvas(p) => {
                self.canvas(p, rect, id);
                return;
            }
            Props::Image(p) => {
                self.image(p, rect, id);
                return;
            }
            Props::Dropdown(_) => {
                overlays.push((tree, id));
                return;
            }
            Props::Spacer(_) => return,
            Props::Layers(_) | Props::PanelGroup(_) | Props::ResizablePanel(_) => rect,
        };
        self.children(tree, id, inner, overlays);
    }

    fn children<'t, 'a>(
        &mut self,
        tree: &'t LayoutTree<'a>,
        id: Option<InstanceId>,
        inner: Rect,
        overlays: &mut Vec<(&'t LayoutTree<'a>, Option<InstanceId>)>,
    ) {
        let overflow = tree.children.iter().any(|child| {
            !matches!(child.node.props, Props::Dropdown(_))
                && !child.rect.is_empty()
                && inner.intersection(&child.rect) != child.rect
        });
        if overflow {
            self.builder.push_clip(inner);
            self.stats.clips += 1;
        }
        let ids = id.map_or(&[][..], |id| self.ctx.instances.children(id));
        for (index, child) in tree.children.iter().enumerate() {
            self.node(child, ids.get(index).copied(), overlays);
        }
        if overflow {
            self.builder.pop_clip();
        }
    }

    /// Queue dropdowns below a node whose own paint was skipped.
    fn collect_overlays<'t, 'a>(
        &self,
        tree: &'t LayoutTree<'a>,
        id: Option<InstanceId>,
        overlays: &mut Vec<(&'t LayoutTree<'a>, Option<InstanceId>)>,
    ) {
        let ids = id.map_or(&[][..], |id| self.ctx.instances.children(id));
        for (index, child) in tree.children.iter().enumerate() {
            let child_id = ids.get(index).copied();
            if matches!(child.node.props, Props::Dropdown(_)) {
                overlays.push((child, child_id));
            } else {
                self.collect_overlays(child, child_id, overlays);
            }
        }
    }

    fn focus_style(&self, id: Option<InstanceId>) -> Option<&'f TextStyle> {
        match (id, self.ctx.focused) {
            (Some(id), Some(focused)) if id == focused => Some(&self.ctx.theme.focused),
            _ => None,
        }
    }

    /// Draw fill, border and title; returns the content rect.
    fn boxed(&mut self, p: &BoxProps, rect: Rect, id: Option<InstanceId>) -> Rect {
        let theme = self.ctx.theme;
        if let Some(fill) = &p.style {
            self.builder.fill_rect(rect, fill);
        }
        let padding = p.layout.padding.resolve();
        let Some([tl, tr, bl, br, h, v]) = border_glyphs(p.border) else {
            return rect.inset(padding.top, padding.right, padding.bottom, padding.left);
        };
        if rect.w < 2 || rect.h < 2 {
            self.warn(DevWarning::BorderTooSmall { instance: id, rect });
            return rect.inset(padding.top, padding.right, padding.bottom, padding.left);
        }

        let style = merge_styles([
            Some(&theme.border),
            p.style.as_ref(),
            p.border_style.as_ref(),
            self.focus_style(id),
        ]);
        let span = cells(rect.w - 2);
        let mut top = String::with_capacity((span + 2) * 3);
        top.push_str(tl);
        top.push_str(&h.repeat(span));
        top.push_str(tr);
        let mut bottom = String::with_capacity((span + 2) * 3);
        bottom.push_str(bl);
        bottom.push_str(&h.repeat(span));
        bottom.push_str(br);
        self.builder.draw_text(rect.x, rect.y, &top, &style);
        self.builder.draw_text(rect.x, rect.bottom() - 1, &bottom, &style);
        for row in rect.y + 1..rect.bottom() - 1 {
            self.builder.draw_text(rect.x, row, v, &style);
            self.builder.draw_text(rect.right() - 1, row, v, &style);
        }

        if let Some(title) = p.title.as_deref().filter(|t| !t.is_empty()) {
            if rect.w > 4 {
                let title_style = merge_styles([Some(&style), Some(&theme.title)]);
                let shown = truncate(title, cells(rect.w - 4), TextOverflow::Ellipsis);
                self.builder.draw_text(rect.x + 2, rect.y, &shown, &title_style);
            }
        }

        let b = p.border.thickness();
        rect.inset(
            padding.top + b,
            padding.right + b,
            padding.bottom + b,
            padding.left + b,
        )
    }

    fn text(&mut self, p: &TextProps, rect: Rect) {
        let style = merge_styles([Some(&self.ctx.theme.text), p.style.as_ref()]);
        let width = cells(rect.w);
        let lines: Vec<&str> = if p.wrap {
            wrap(&p.content, width)
        } else {
            p.content.split('\n').collect()
        };
        let link = style
            .link
            .as_ref()
            .filter(|_| self.supports(Opcode::SetLink));
        if let Some(link) = link {
            self.builder.set_link(Some(link));
        }
        for (row, line) in lines.iter().take(cells(rect.h)).enumerate() {
            let shown = truncate(line, width, p.overflow);
            if !shown.is_empty() {
                self.builder.draw_text(rect.x, rect.y + row as i32, &shown, &style);
                self.stats.lines += 1;
            }
        }
        if link.is_some() {
            self.builder.set_link(None);
        }
    }

    fn button(&mut self, p: &ButtonProps, rect: Rect, id: Option<InstanceId>) {
        let theme = self.ctx.theme;
        let state = if p.disabled {
            Some(&theme.button_disabled)
        } else {
            self.focus_style(id)
        };
        let style = merge_styles([Some(&theme.button), p.style.as_ref(), state]);
        self.builder.fill_rect(rect, &style);
        if rect.w > 2 {
            let label = truncate(&p.label, cells(rect.w - 2), TextOverflow::Ellipsis);
            let slack = cells(rect.w - 2).saturating_sub(text_width(&label)) as i32;
            let y = rect.y + (rect.h - 1) / 2;
            self.builder.draw_text(rect.x + 1 + slack / 2, y, &label, &style);
            self.stats.lines += 1;
        }
    }

    fn rich_text(&mut self, p: &RichTextProps, rect: Rect) {
        let base = &self.ctx.theme.text;
        let mut remaining = cells(rect.w);
        let mut parts: Vec<(Cow<'_, str>, TextStyle)> = Vec::with_capacity(p.spans.len());
        for span in &p.spans {
            if remaining == 0 {
                break;
            }
            let shown = truncate(&span.text, remaining, TextOverflow::Clip);
            remaining = remaining.saturating_sub(text_width(&shown));
            if !shown.is_empty() {
                parts.push((shown, base.overlaid(&span.style)));
            }
        }
        if parts.is_empty() {
            return;
        }
        let segments: Vec<TextRunSegment<'_>> = parts
            .iter()
            .map(|(text, style)| TextRunSegment {
                text: text.as_ref(),
                style,
            })
            .collect();
        if let Some(blob) = self.builder.add_text_run_blob(&segments) {
            self.builder.draw_text_run(rect.x, rect.y, blob);
            self.stats.lines += 1;
        }
    }

    fn placeholder(&mut self, rect: Rect, kind: NodeKind) {
        let version = self.builder.version();
        self.warn(DevWarning::Unsupported { kind, version });
        let theme = self.ctx.theme;
        self.builder.fill_rect(rect, &theme.placeholder);
    }

    fn canvas(&mut self, p: &CanvasProps, rect: Rect, id: Option<InstanceId>) {
        if !self.supports(Opcode::DrawCanvas) {
            self.placeholder(rect, NodeKind::Canvas);
            return;
        }
        let stamp = (u64::from(p.px_width) << 32) | u64::from(p.px_height);
        let blob = match id {
            Some(id) => {
                let key = format!("canvas/{}", id.get());
                self.builder
                    .add_blob_keyed(&key, stamp, &mut |out: &mut Vec<u8>| out.extend_from_slice(&p.pixels))
            }
            None => self.builder.add_blob(&p.pixels),
        };
        if let Some(blob) = blob {
            self.builder
                .draw_canvas(rect, blob, p.px_width, p.px_height, p.blitter);
        }
    }

    fn image(&mut self, p: &ImageProps, rect: Rect, id: Option<InstanceId>) {
        if !self.supports(Opcode::DrawImage) {
            self.placeholder(rect, NodeKind::Image);
            return;
        }
        let stamp = (u64::from(p.px_width) << 32) | u64::from(p.px_height);
        let blob = match id {
            Some(id) => {
                let key = format!("image/{}", id.get());
                self.builder
                    .add_blob_keyed(&key, stamp, &mut |out: &mut Vec<u8>| out.extend_from_slice(&p.data))
            }
            None => self.builder.add_blob(&p.data),
        };
        if let Some(blob) = blob {
            let params = ImageParams {
                format: p.format,
                px_width: p.px_width,
                px_height: p.px_height,
                image_id: p.image_id,
            };
            self.builder.draw_image(rect, blob, params);
        }
    }

    fn overlay(&mut self, tree: &LayoutTree<'_>, id: Option<InstanceId>) {
        let Props::Dropdown(p) = &tree.node.props else {
            return;
        };
        self.stats.overlays += 1;
        if tree.rect.is_empty() {
            self.warn(DevWarning::MissingAnchor {
                anchor: p.anchor_id.clone(),
            });
            return;
        }
        self.dropdown(p, tree.rect, id);
    }

    fn dropdown(&mut self, p: &DropdownProps, rect: Rect, id: Option<InstanceId>) {
        let theme = self.ctx.theme;
        let frame = merge_styles([Some(&theme.dropdown), p.style.as_ref()]);
        let boxed = BoxProps {
            border: Border::Single,
            style: Some(frame.clone()),
            ..BoxProps::default()
        };
        let inner = self.boxed(&boxed, rect, id);
        if inner.is_empty() {
            return;
        }

        let overflowing = p.items.len() > cells(inner.h);
        let text_w = cells(inner.w - crate::layout::SCROLLBAR_GUTTER);
        for (row, item) in p.items.iter().take(cells(inner.h)).enumerate() {
            let y = inner.y + row as i32;
            let state = if item.disabled {
                Some(&theme.dropdown_disabled)
            } else if p.selected == Some(row) {
                Some(&theme.dropdown_selected)
            } else {
                None
            };
            let style = merge_styles([Some(&frame), state]);
            if state.is_some() {
                self.builder.fill_rect(Rect::new(inner.x, y, inner.w, 1), &style);
            }
            let label = truncate(&item.label, text_w, TextOverflow::Ellipsis);
            self.builder.draw_text(inner.x, y, &label, &style);
            if let Some(shortcut) = item.shortcut.as_deref() {
                let sw = text_width(shortcut);
                if text_width(&label) + 1 + sw <= text_w {
                    let x = inner.x + (text_w - sw) as i32;
                    self.builder.draw_text(x, y, shortcut, &style);
                }
            }
            self.stats.lines += 1;
        }
        if overflowing {
            self.builder
                .draw_text(inner.right() - 1, inner.bottom() - 1, "▼", &frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawlist::{parse, Builder, Command, DrawlistVersion};
    use crate::layout::{layout, Axis};
    use crate::tree::{commit, DropdownItem, IgnoreEffects, VNode};

    fn paint(node: &VNode, version: DrawlistVersion, dev: bool) -> (Vec<u8>, Vec<DevWarning>) {
        let mut instances = InstanceTree::new();
        let outcome = commit(&mut instances, node, &mut IgnoreEffects).unwrap();
        let tree = layout(node, 0, 0, 20, 6, Axis::Vertical).unwrap();
        let theme = Theme::plain();
        let ctx = FrameContext {
            instances: &instances,
            root: Some(outcome.root),
            focused: None,
            theme: &theme,
            viewport: (20, 6),
            cursor: None,
            dev_mode: dev,
        };
        let mut builder = Builder::new(version);
        let mut warnings = Vec::new();
        encode_frame(&mut builder, &tree, &ctx, &mut |w: &DevWarning| warnings.push(w.clone()));
        let bytes = builder.build().unwrap().to_vec();
        (bytes, warnings)
    }

    #[test]
    fn test_box_with_title_and_text() {
        let node = VNode::boxed(
            BoxProps {
                border: Border::Rounded,
                title: Some("Log".into()),
                ..BoxProps::default()
            },
            vec![VNode::text("hello")],
        );
        let (bytes, _) = paint(&node, DrawlistVersion::V3, false);
        let parsed = parse(&bytes).unwrap();
        let text = parsed.visible_text();
        assert!(text.iter().any(|t| t.starts_with('╭') && t.ends_with('╮')));
        assert!(text.contains(&"Log".to_owned()));
        assert!(text.contains(&"hello".to_owned()));
        assert!(matches!(
            parsed.commands.last(),
            Some(Command::SetCursor(CursorState { visible: false, .. }))
        ));
    }

    #[test]
    fn test_overflowing_children_are_clipped() {
        let wide = VNode::new(TextProps {
            content: "x".repeat(30),
            layout: crate::tree::LayoutProps {
                width: crate::layout::Size::Cells(30),
                flex_shrink: 0.0,
                ..crate::tree::LayoutProps::DEFAULT
            },
            ..TextProps::default()
        });
        let (bytes, _) = paint(&VNode::row(vec![wide]), DrawlistVersion::V3, false);
        let parsed = parse(&bytes).unwrap();
        let pushes = parsed
            .commands
            .iter()
            .filter(|c| matches!(c, Command::PushClip { .. }))
            .count();
        assert_eq!(pushes, 1);
        assert!(parsed.commands.contains(&Command::PushClip { rect: Rect::new(0, 0, 20, 1) }));
    }

    #[test]
    fn test_canvas_falls_back_on_old_version() {
        let canvas = VNode::new(CanvasProps::new(2, 2, vec![0u8; 16]));
        let (bytes, warnings) = paint(&canvas, DrawlistVersion::V2, true);
        let parsed = parse(&bytes).unwrap();
        assert!(!parsed
            .commands
            .iter()
            .any(|c| matches!(c, Command::DrawCanvas { .. })));
        assert!(matches!(warnings[0], DevWarning::Unsupported { .. }));

        let (bytes, _) = paint(&canvas, DrawlistVersion::V3, true);
        let parsed = parse(&bytes).unwrap();
        assert!(parsed
            .commands
            .iter()
            .any(|c| matches!(c, Command::DrawCanvas { px_width: 2, px_height: 2, .. })));
    }

    #[test]
    fn test_dropdown_drawn_last() {
        let node = VNode::layers(vec![
            VNode::column(vec![VNode::button("File").with_id("file")]),
            VNode::new(DropdownProps {
                anchor_id: "file".into(),
                items: vec![DropdownItem::new("Open"), DropdownItem::new("Quit")],
                selected: Some(1),
                ..DropdownProps::default()
            }),
        ]);
        let (bytes, _) = paint(&node, DrawlistVersion::V3, false);
        let parsed = parse(&bytes).unwrap();
        let text = parsed.visible_text();
        let file = text.iter().position(|t| t == "File").unwrap();
        let quit = text.iter().position(|t| t == "Quit").unwrap();
        assert!(quit > file);
    }

    #[test]
    fn test_dropdown_inside_collapsed_box_is_drawn() {
        let collapsed = VNode::boxed(
            BoxProps {
                layout: crate::tree::LayoutProps {
                    height: crate::layout::Size::Cells(0),
                    ..crate::tree::LayoutProps::DEFAULT
                },
                ..BoxProps::default()
            },
            vec![VNode::new(DropdownProps {
                anchor_id: "file".into(),
                items: vec![DropdownItem::new("Open"), DropdownItem::new("Quit")],
                ..DropdownProps::default()
            })],
        );
        let node = VNode::layers(vec![
            VNode::column(vec![VNode::button("File").with_id("file")]),
            collapsed,
        ]);
        let (bytes, _) = paint(&node, DrawlistVersion::V3, false);
        let text = parse(&bytes).unwrap().visible_text();
        assert!(text.contains(&"Quit".to_owned()));
    }

    #[test]
    fn test_zero_size_warning_only_in_dev_mode() {
        let node = VNode::row(vec![VNode::new(TextProps {
            content: "hidden".into(),
            layout: crate::tree::LayoutProps {
                width: crate::layout::Size::Cells(0),
                ..crate::tree::LayoutProps::DEFAULT
            },
            ..TextProps::default()
        })]);
        let (_, warnings) = paint(&node, DrawlistVersion::V3, true);
        assert!(matches!(warnings[0], DevWarning::ZeroSize { .. }));
        let (_, warnings) = paint(&node, DrawlistVersion::V3, false);
        assert!(warnings.is_empty());
    }
}
