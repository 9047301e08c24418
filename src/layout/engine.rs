//! Layout engine: resolves a VNode tree into integer cell rectangles.
//!
//! Layout runs in two phases per container:
//!
//! ```text
//! measure  ── intrinsic size of each child at the space on offer
//!    │
//! plan     ── break into lines, grow/shrink along the main axis
//!    │         └─ remeasure children whose height depends on the
//!    │            width they finally got (wrapped text)
//! arrange  ── assign rects, align on the cross axis, recurse
//! ```
//!
//! After the tree is arranged, anchored overlays (dropdowns) are moved next
//! to their anchors inside the viewport.
//!
//! All coordinates are `i32`. A rect that cannot be represented, a
//! negative size or a non-finite percentage aborts the layout call with
//! [`FatalCode::InvalidProps`](crate::error::FatalCode::InvalidProps).

use std::collections::HashMap;

use super::distribute::{distribute_integer, distribute_integer_into};
use super::overlay::dropdown_rect;
use super::rect::Rect;
use super::spacing::Edges;
use crate::buffer::{ArrayPool, PoolStats};
use crate::error::{Fatal, FatalCode};
use crate::text::{text_width, wrapped_size};
use crate::tree::{LayoutProps, PanelProps, Props, VNode};

/// A requested width or height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Size {
    /// Size to content.
    #[default]
    Auto,
    /// Fixed cells.
    Cells(i32),
    /// Percentage of the space on offer, floored.
    Percent(f64),
}

/// Layout direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Axis {
    /// Left to right; the main size is the width.
    #[default]
    Horizontal,
    /// Top to bottom; the main size is the height.
    Vertical,
}

impl Axis {
    /// The other axis.
    #[inline]
    pub const fn cross(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    /// Main-axis component of a `(w, h)` pair.
    #[inline]
    pub const fn main_of(self, w: i32, h: i32) -> i32 {
        match self {
            Self::Horizontal => w,
            Self::Vertical => h,
        }
    }

    /// Cross-axis component of a `(w, h)` pair.
    #[inline]
    pub const fn cross_of(self, w: i32, h: i32) -> i32 {
        self.cross().main_of(w, h)
    }

    /// Build a `(w, h)` (or `(x, y)`) pair from main and cross components.
    #[inline]
    pub const fn to_wh<T: Copy>(self, main: T, cross: T) -> (T, T) {
        match self {
            Self::Horizontal => (main, cross),
            Self::Vertical => (cross, main),
        }
    }

    const fn main_edges(self, e: Edges) -> (i32, i32) {
        match self {
            Self::Horizontal => (e.left, e.right),
            Self::Vertical => (e.top, e.bottom),
        }
    }

    const fn cross_edges(self, e: Edges) -> (i32, i32) {
        self.cross().main_edges(e)
    }
}

/// Cross-axis placement of children within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Align {
    /// Top or left.
    Start,
    /// Centered, leftover split with the extra cell after.
    Center,
    /// Bottom or right.
    End,
    /// Fill the line.
    #[default]
    Stretch,
}

/// Main-axis placement of free space within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Justify {
    /// Pack at the start.
    #[default]
    Start,
    /// Pack in the middle.
    Center,
    /// Pack at the end.
    End,
    /// Spread free space between children.
    SpaceBetween,
}

/// One laid-out node.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree<'a> {
    /// Border-box rect.
    pub rect: Rect,
    /// The node this rect was computed for.
    pub node: &'a VNode,
    /// Children in VNode order.
    pub children: Vec<LayoutTree<'a>>,
}

impl<'a> LayoutTree<'a> {
    /// Number of nodes in this subtree.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Self::len).sum::<usize>()
    }

    /// Always false; a layout tree has at least its root.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// First node in preorder whose VNode has `id`.
    pub fn find(&self, id: &str) -> Option<&Self> {
        if self.node.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Visit every node in preorder.
    pub fn walk(&self, f: &mut impl FnMut(&Self)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}

/// Counters for the last layout call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    /// Nodes arranged.
    pub nodes: usize,
    /// Second-pass measurements at an allocated width.
    pub remeasures: usize,
    /// Overlays placed next to their anchors.
    pub overlays: usize,
}

/// Stack behavior derived from a container's props.
#[derive(Debug, Clone, Copy)]
struct StackSpec {
    axis: Axis,
    gap: i32,
    line_gap: i32,
    wrap: bool,
    align: Align,
    justify: Justify,
}

impl StackSpec {
    const fn column(gap: i32) -> Self {
        Self {
            axis: Axis::Vertical,
            gap,
            line_gap: 0,
            wrap: false,
            align: Align::Stretch,
            justify: Justify::Start,
        }
    }

    fn of(props: &Props) -> Option<Self> {
        let from_stack = |axis, p: &crate::tree::StackProps| Self {
            axis,
            gap: p.gap,
            line_gap: p.line_gap,
            wrap: p.wrap,
            align: p.align,
            justify: p.justify,
        };
        match props {
            Props::Row(p) => Some(from_stack(Axis::Horizontal, p)),
            Props::Column(p) => Some(from_stack(Axis::Vertical, p)),
            Props::Box(p) => Some(Self::column(p.gap)),
            Props::ResizablePanel(_) => Some(Self::column(0)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    end: usize,
    /// Main-axis extent including margins and gaps.
    used: i64,
    /// Largest child cross size including margins.
    cross: i32,
}

/// Sizes of one container's children. `main`, `cross` come from the pool.
#[derive(Debug)]
struct Plan {
    main: Vec<i32>,
    cross: Vec<i32>,
    margins: Vec<Edges>,
    lines: Vec<Line>,
}

/// Reusable layout state: the scratch array pool and counters.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    pool: ArrayPool,
    stats: LayoutStats,
}

/// Lay out `node` in a fresh engine. See [`LayoutEngine::layout`].
pub fn layout(
    node: &VNode,
    x: i32,
    y: i32,
    max_w: i32,
    max_h: i32,
    axis: Axis,
) -> Result<LayoutTree<'_>, Fatal> {
    LayoutEngine::new().layout(node, x, y, max_w, max_h, axis)
}

fn to_cells(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn to_i32(value: i64, what: &str) -> Result<i32, Fatal> {
    i32::try_from(value)
        .map_err(|_| Fatal::invalid_props(format!("{what} {value} does not fit in i32")))
}

fn bound(value: i32, min: Option<i32>, max: Option<i32>) -> i32 {
    let value = max.map_or(value, |max| value.min(max));
    min.map_or(value, |min| value.max(min)).max(0)
}

fn resolve_size(size: Size, avail: i32) -> Result<Option<i32>, Fatal> {
    match size {
        Size::Auto => Ok(None),
        Size::Cells(n) if n < 0 => Err(Fatal::invalid_props(format!("negative size {n}"))),
        Size::Cells(n) => Ok(Some(n)),
        Size::Percent(p) => {
            if !p.is_finite() || p < 0.0 {
                return Err(Fatal::invalid_props(format!("size {p}% is not a finite percentage")));
            }
            let cells = (f64::from(avail.max(0)) * p / 100.0).floor();
            if cells > f64::from(i32::MAX) {
                return Err(Fatal::invalid_props(format!("size {p}% overflows")));
            }
            Ok(Some(cells as i32))
        }
    }
}

/// Padding plus border.
fn chrome(node: &VNode) -> Edges {
    let padding = node.props.layout().padding.resolve();
    match &node.props {
        Props::Box(p) => padding.add(Edges::uniform(p.border.thickness())),
        _ => padding,
    }
}

fn grow_weight(node: &VNode) -> f64 {
    match &node.props {
        Props::Spacer(p) => p.flex,
        Props::Dropdown(_) => 0.0,
        props => props.layout().flex,
    }
}

fn shrink_weight(node: &VNode) -> f64 {
    match &node.props {
        Props::Spacer(_) => 1.0,
        Props::Dropdown(_) => 0.0,
        props => props.layout().flex_shrink,
    }
}

fn main_bounds(layout: &LayoutProps, axis: Axis) -> (Option<i32>, Option<i32>) {
    match axis {
        Axis::Horizontal => (layout.min_width, layout.max_width),
        Axis::Vertical => (layout.min_height, layout.max_height),
    }
}

fn main_size(layout: &LayoutProps, axis: Axis) -> Size {
    match axis {
        Axis::Horizontal => layout.width,
        Axis::Vertical => layout.height,
    }
}

/// Whether the node's height can change with the width it is given.
fn depends_on_width(node: &VNode) -> bool {
    match &node.props {
        Props::Text(p) => p.wrap,
        Props::Row(p) if p.wrap => true,
        _ => node.children.iter().any(depends_on_width),
    }
}

/// Panel percentages after defaults, normalization and min/max clamping.
///
/// Unset defaults split what the set ones leave. The total is scaled to
/// 100, then any panel pushed outside its bounds is pinned there and the
/// rest are rescaled to fill the remainder, until nothing moves.
pub fn resolve_panel_sizes(panels: &[&PanelProps]) -> Vec<f64> {
    let n = panels.len();
    if n == 0 {
        return Vec::new();
    }
    let given: f64 = panels.iter().filter_map(|p| p.default_size).sum();
    let unset = panels.iter().filter(|p| p.default_size.is_none()).count();
    let share = if unset > 0 {
        (100.0 - given).max(0.0) / unset as f64
    } else {
        0.0
    };
    let mut sizes: Vec<f64> = panels
        .iter()
        .map(|p| p.default_size.unwrap_or(share))
        .collect();

    let total: f64 = sizes.iter().sum();
    if total > 0.0 {
        for size in &mut sizes {
            *size *= 100.0 / total;
        }
    } else {
        sizes.fill(100.0 / n as f64);
    }

    let mut pinned = vec![false; n];
    for _ in 0..=n {
        let pinned_total: f64 = (0..n).filter(|&i| pinned[i]).map(|i| sizes[i]).sum();
        let free = (100.0 - pinned_total).max(0.0);
        let loose: Vec<usize> = (0..n).filter(|&i| !pinned[i]).collect();
        if loose.is_empty() {
            break;
        }
        let loose_total: f64 = loose.iter().map(|&i| sizes[i]).sum();
        for &i in &loose {
            sizes[i] = if loose_total > 0.0 {
                sizes[i] * free / loose_total
            } else {
                free / loose.len() as f64
            };
        }

        let mut moved = false;
        for &i in &loose {
            let min = panels[i].min_size.unwrap_or(0.0);
            let max = panels[i].max_size.unwrap_or(100.0).max(min);
            let clamped = sizes[i].clamp(min, max);
            if clamped != sizes[i] {
                sizes[i] = clamped;
                pinned[i] = true;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
    sizes
}

impl LayoutEngine {
    /// Create an engine with an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters from the last [`layout`](Self::layout) call.
    pub const fn stats(&self) -> LayoutStats {
        self.stats
    }

    /// Scratch pool counters since creation.
    pub const fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Drop pooled arrays.
    pub fn release(&mut self) {
        self.pool.clear();
    }

    /// Lay out `node` inside `max_w x max_h` cells at `(x, y)`.
    ///
    /// The root is placed as the only child of a stack running along
    /// `axis`: it grows along `axis` only with `flex`, and stretches across
    /// it unless it has an explicit size.
    pub fn layout<'a>(
        &mut self,
        node: &'a VNode,
        x: i32,
        y: i32,
        max_w: i32,
        max_h: i32,
        axis: Axis,
    ) -> Result<LayoutTree<'a>, Fatal> {
        self.stats = LayoutStats::default();
        let viewport = Rect::checked(x, y, max_w, max_h).ok_or_else(|| {
            Fatal::invalid_props(format!("viewport {x},{y} {max_w}x{max_h} is out of range"))
        })?;
        let spec = StackSpec {
            axis,
            ..StackSpec::column(0)
        };
        let mut placed = self.arrange_stack(std::slice::from_ref(node), spec, viewport)?;
        let mut tree = placed
            .pop()
            .ok_or_else(|| Fatal::new(FatalCode::InvalidProps, "root produced no layout"))?;
        self.place_overlays(&mut tree, viewport);
        tracing::debug!(
            nodes = self.stats.nodes,
            remeasures = self.stats.remeasures,
            overlays = self.stats.overlays,
            "layout complete"
        );
        Ok(tree)
    }

    /// Border-box size of `node` given `avail_w x avail_h`.
    fn measure(&mut self, node: &VNode, avail_w: i32, avail_h: i32) -> Result<(i32, i32), Fatal> {
        self.measure_sized(node, avail_w, avail_h, None)
    }

    /// Border-box size of `node` once its width is settled at `w`.
    ///
    /// The declared width is not resolved again: a percentage would
    /// otherwise apply to `w` instead of the container.
    fn measure_at(&mut self, node: &VNode, w: i32, avail_h: i32) -> Result<(i32, i32), Fatal> {
        self.measure_sized(node, w, avail_h, Some(w.max(0)))
    }

    fn measure_sized(
        &mut self,
        node: &VNode,
        avail_w: i32,
        avail_h: i32,
        fixed_w: Option<i32>,
    ) -> Result<(i32, i32), Fatal> {
        let avail_w = avail_w.max(0);
        let avail_h = avail_h.max(0);
        let layout = node.props.layout();
        let chrome = chrome(node);
        let explicit_w = match fixed_w {
            Some(w) => Some(w),
            None => resolve_size(layout.width, avail_w)?,
        };
        let explicit_h = resolve_size(layout.height, avail_h)?;
        let inner_w = (explicit_w.unwrap_or(avail_w) - chrome.horizontal()).max(0);
        let inner_h = (explicit_h.unwrap_or(avail_h) - chrome.vertical()).max(0);
        let (content_w, content_h) = self.measure_content(node, inner_w, inner_h)?;
        let w = explicit_w.unwrap_or_else(|| content_w.saturating_add(chrome.horizontal()));
        let h = explicit_h.unwrap_or_else(|| content_h.saturating_add(chrome.vertical()));
        Ok((
            bound(w, layout.min_width, layout.max_width),
            bound(h, layout.min_height, layout.max_height),
        ))
    }

    fn measure_content(
        &mut self,
        node: &VNode,
        inner_w: i32,
        inner_h: i32,
    ) -> Result<(i32, i32), Fatal> {
        let size = match &node.props {
            Props::Text(p) => {
                if p.wrap {
                    let (lines, widest) = wrapped_size(&p.content, inner_w as usize);
                    (to_cells(widest), to_cells(lines))
                } else {
                    let widest = p.content.split('\n').map(text_width).max().unwrap_or(0);
                    let lines = p.content.split('\n').count();
                    (to_cells(widest).min(inner_w), to_cells(lines))
                }
            }
            Props::Button(p) => (to_cells(text_width(&p.label)).saturating_add(2), 1),
            Props::RichText(p) => {
                let width: usize = p.spans.iter().map(|s| text_width(&s.text)).sum();
                (to_cells(width).min(inner_w), 1)
            }
            Props::Canvas(p) => (to_cells(p.px_width as usize), to_cells(p.px_height.div_ceil(2) as usize)),
            Props::Image(p) => (
                to_cells(p.px_width.div_ceil(8) as usize),
                to_cells(p.px_height.div_ceil(16) as usize),
            ),
            Props::Spacer(_) | Props::Dropdown(_) => (0, 0),
            Props::Layers(_) => {
                let mut size = (0, 0);
                for child in &node.children {
                    let margin = child.props.layout().margin.resolve();
                    let (w, h) = self.measure(
                        child,
                        inner_w - margin.horizontal(),
                        inner_h - margin.vertical(),
                    )?;
                    size.0 = size.0.max(w.saturating_add(margin.horizontal()));
                    size.1 = size.1.max(h.saturating_add(margin.vertical()));
                }
                size
            }
            Props::PanelGroup(p) => {
                let mut cross = 0;
                for child in &node.children {
                    let (w, h) = self.measure(child, inner_w, inner_h)?;
                    cross = cross.max(p.direction.cross_of(w, h));
                }
                p.direction.to_wh(p.direction.main_of(inner_w, inner_h), cross)
            }
            props => match StackSpec::of(props) {
                Some(spec) => {
                    let axis = spec.axis;
                    let plan = self.plan_stack(
                        &node.children,
                        spec,
                        axis.main_of(inner_w, inner_h),
                        axis.cross_of(inner_w, inner_h),
                    )?;
                    let main = plan.lines.iter().map(|l| l.used).max().unwrap_or(0);
                    let lines = plan.lines.len() as i64;
                    let cross = plan.lines.iter().map(|l| i64::from(l.cross)).sum::<i64>()
                        + i64::from(spec.line_gap) * (lines - 1).max(0);
                    self.recycle(plan);
                    axis.to_wh(to_i32(main, "content width")?, to_i32(cross, "content height")?)
                }
                None => (0, 0),
            },
        };
        Ok(size)
    }

    /// Measure children, break lines and resolve main sizes.
    fn plan_stack(
        &mut self,
        children: &[VNode],
        spec: StackSpec,
        inner_main: i32,
        inner_cross: i32,
    ) -> Result<Plan, Fatal> {
        let axis = spec.axis;
        let n = children.len();
        let mut basis = self.pool.take(n);
        let mut plan = Plan {
            main: self.pool.take(n),
            cross: self.pool.take(n),
            margins: Vec::with_capacity(n),
            lines: Vec::new(),
        };

        let mut measured = Ok(());
        for (i, child) in children.iter().enumerate() {
            let margin = child.props.layout().margin.resolve();
            let (mb, ma) = axis.main_edges(margin);
            let (cb, ca) = axis.cross_edges(margin);
            let avail_main = (inner_main - mb - ma).max(0);
            let avail_cross = (inner_cross - cb - ca).max(0);
            let (main, cross) = match &child.props {
                Props::Spacer(p) => (p.size, 0),
                Props::Dropdown(_) => (0, 0),
                _ => {
                    let (aw, ah) = axis.to_wh(avail_main, avail_cross);
                    match self.measure(child, aw, ah) {
                        Ok((w, h)) => (axis.main_of(w, h), axis.cross_of(w, h)),
                        Err(err) => {
                            measured = Err(err);
                            break;
                        }
                    }
                }
            };
            basis[i] = main;
            plan.main[i] = main;
            plan.cross[i] = cross;
            plan.margins.push(margin);
        }
        if let Err(err) = measured {
            self.pool.give_back(basis);
            self.recycle(plan);
            return Err(err);
        }

        let gap = i64::from(spec.gap);
        let mut start = 0;
        let mut used: i64 = 0;
        for i in 0..n {
            let (mb, ma) = axis.main_edges(plan.margins[i]);
            let outer = i64::from(basis[i]) + i64::from(mb) + i64::from(ma);
            let extended = if i > start { used + gap + outer } else { outer };
            if spec.wrap && i > start && extended > i64::from(inner_main) {
                plan.lines.push(Line { start, end: i, used, cross: 0 });
                start = i;
                used = outer;
            } else {
                used = extended;
            }
        }
        if start < n {
            plan.lines.push(Line { start, end: n, used, cross: 0 });
        }

        let mut lines = std::mem::take(&mut plan.lines);
        let mut result = Ok(());
        for line in &mut lines {
            result = self.flex_line(children, spec, line, &basis, &mut plan, inner_main, inner_cross);
            if result.is_err() {
                break;
            }
        }
        plan.lines = lines;
        self.pool.give_back(basis);
        match result {
            Ok(()) => Ok(plan),
            Err(err) => {
                self.recycle(plan);
                Err(err)
            }
        }
    }

    /// Grow or shrink one line, then remeasure width-dependent children.
    #[allow(clippy::too_many_arguments)]
    fn flex_line(
        &mut self,
        children: &[VNode],
        spec: StackSpec,
        line: &mut Line,
        basis: &[i32],
        plan: &mut Plan,
        inner_main: i32,
        inner_cross: i32,
    ) -> Result<(), Fatal> {
        let axis = spec.axis;
        let range = line.start..line.end;
        let free = i64::from(inner_main) - line.used;
        let members = &children[range.clone()];

        if free != 0 {
            let weights: Vec<f64> = if free > 0 {
                members.iter().map(grow_weight).collect()
            } else {
                members
                    .iter()
                    .zip(&basis[range.clone()])
                    .map(|(child, &b)| shrink_weight(child) * f64::from(b))
                    .collect()
            };
            let amount = i32::try_from(free.unsigned_abs()).unwrap_or(i32::MAX);
            let mut delta = self.pool.take(members.len());
            distribute_integer_into(amount, &weights, &mut delta);
            for (k, child) in members.iter().enumerate() {
                let i = line.start + k;
                let (min, max) = main_bounds(child.props.layout(), axis);
                let resized = if free > 0 {
                    plan.main[i].saturating_add(delta[k])
                } else {
                    plan.main[i] - delta[k]
                };
                plan.main[i] = if delta[k] == 0 {
                    plan.main[i]
                } else {
                    bound(resized, min, max)
                };
            }
            self.pool.give_back(delta);
        }

        if axis == Axis::Horizontal {
            for (k, child) in members.iter().enumerate() {
                let i = line.start + k;
                if plan.main[i] == basis[i] || !depends_on_width(child) {
                    continue;
                }
                let (cb, ca) = axis.cross_edges(plan.margins[i]);
                let (_, h) = self.measure_at(child, plan.main[i], inner_cross - cb - ca)?;
                plan.cross[i] = h;
                self.stats.remeasures += 1;
            }
        }

        let gaps = i64::from(spec.gap) * (members.len() as i64 - 1).max(0);
        line.used = gaps;
        line.cross = 0;
        for i in range {
            let (mb, ma) = axis.main_edges(plan.margins[i]);
            let (cb, ca) = axis.cross_edges(plan.margins[i]);
            line.used += i64::from(plan.main[i]) + i64::from(mb) + i64::from(ma);
            line.cross = line.cross.max(plan.cross[i].saturating_add(cb + ca));
        }
        Ok(())
    }

    fn recycle(&mut self, plan: Plan) {
        self.pool.give_back(plan.main);
        self.pool.give_back(plan.cross);
    }

    /// Assign `rect` to `node` and lay out its children inside it.
    fn arrange<'a>(&mut self, node: &'a VNode, rect: Rect) -> Result<LayoutTree<'a>, Fatal> {
        let rect = Rect::checked(rect.x, rect.y, rect.w, rect.h).ok_or_else(|| {
            Fatal::invalid_props(format!("{} rect {rect:?} is out of range", node.kind()))
        })?;
        self.stats.nodes += 1;
        let c = chrome(node);
        let inner = rect.inset(c.top, c.right, c.bottom, c.left);

        let children = if node.kind().is_leaf() {
            Vec::new()
        } else {
            match &node.props {
                Props::Layers(_) => self.arrange_layers(&node.children, inner)?,
                Props::PanelGroup(p) => self.arrange_panels(&node.children, p.direction, inner)?,
                props => match StackSpec::of(props) {
                    Some(spec) => self.arrange_stack(&node.children, spec, inner)?,
                    None => Vec::new(),
                },
            }
        };
        Ok(LayoutTree { rect, node, children })
    }

    fn arrange_stack<'a>(
        &mut self,
        children: &'a [VNode],
        spec: StackSpec,
        inner: Rect,
    ) -> Result<Vec<LayoutTree<'a>>, Fatal> {
        let axis = spec.axis;
        let plan = self.plan_stack(
            children,
            spec,
            axis.main_of(inner.w, inner.h),
            axis.cross_of(inner.w, inner.h),
        )?;
        let placed = self.place_lines(children, spec, inner, &plan);
        self.recycle(plan);
        placed
    }

    fn place_lines<'a>(
        &mut self,
        children: &'a [VNode],
        spec: StackSpec,
        inner: Rect,
        plan: &Plan,
    ) -> Result<Vec<LayoutTree<'a>>, Fatal> {
        let axis = spec.axis;
        let inner_main = axis.main_of(inner.w, inner.h);
        let inner_cross = axis.cross_of(inner.w, inner.h);
        let (main_origin, cross_origin) = axis.to_wh(inner.x, inner.y);
        let mut out = Vec::with_capacity(children.len());
        let mut line_pos = i64::from(cross_origin);

        for line in &plan.lines {
            let count = line.end - line.start;
            let line_cross = if spec.wrap { line.cross } else { inner_cross };
            let free = (i64::from(inner_main) - line.used).max(0);
            let offset = match spec.justify {
                Justify::Start | Justify::SpaceBetween => 0,
                Justify::Center => free / 2,
                Justify::End => free,
            };
            let spread = if spec.justify == Justify::SpaceBetween && count > 1 {
                distribute_integer(to_i32(free, "free space")?, &vec![1.0; count - 1])
            } else {
                Vec::new()
            };

            let mut pos = i64::from(main_origin) + offset;
            for (k, child) in children[line.start..line.end].iter().enumerate() {
                let i = line.start + k;
                let (mb, ma) = axis.main_edges(plan.margins[i]);
                let (cb, ca) = axis.cross_edges(plan.margins[i]);
                pos += i64::from(mb);

                let avail_cross = (line_cross - cb - ca).max(0);
                let layout = child.props.layout();
                let cross_auto = main_size(layout, axis.cross()) == Size::Auto;
                let stretch = spec.align == Align::Stretch
                    && cross_auto
                    && !matches!(child.props, Props::Spacer(_) | Props::Dropdown(_));
                let size_cross = if stretch {
                    let (min, max) = main_bounds(layout, axis.cross());
                    bound(avail_cross, min, max)
                } else {
                    plan.cross[i]
                };
                let cross_offset = match spec.align {
                    Align::Start | Align::Stretch => 0,
                    Align::Center => (avail_cross - size_cross).max(0) / 2,
                    Align::End => (avail_cross - size_cross).max(0),
                };
                let cpos = line_pos + i64::from(cb) + i64::from(cross_offset);

                let (x, y) = axis.to_wh(to_i32(pos, "x")?, to_i32(cpos, "y")?);
                let (w, h) = axis.to_wh(plan.main[i], size_cross);
                out.push(self.arrange(child, Rect::new(x, y, w, h))?);

                pos += i64::from(plan.main[i]) + i64::from(ma) + i64::from(spec.gap);
                if let Some(extra) = spread.get(k) {
                    pos += i64::from(*extra);
                }
            }
            line_pos += i64::from(line_cross) + i64::from(spec.line_gap);
        }
        Ok(out)
    }

    fn arrange_layers<'a>(
        &mut self,
        children: &'a [VNode],
        inner: Rect,
    ) -> Result<Vec<LayoutTree<'a>>, Fatal> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            let m = child.props.layout().margin.resolve();
            let slot = inner.inset(m.top, m.right, m.bottom, m.left);
            let layout = child.props.layout();
            let (mw, mh) = self.measure(child, slot.w, slot.h)?;
            let w = if layout.width == Size::Auto {
                bound(slot.w, layout.min_width, layout.max_width)
            } else {
                mw
            };
            let h = if layout.height == Size::Auto {
                bound(slot.h, layout.min_height, layout.max_height)
            } else {
                mh
            };
            let rect = if matches!(child.props, Props::Dropdown(_)) {
                Rect::new(slot.x, slot.y, 0, 0)
            } else {
                Rect::new(slot.x, slot.y, w, h)
            };
            out.push(self.arrange(child, rect)?);
        }
        Ok(out)
    }

    fn arrange_panels<'a>(
        &mut self,
        children: &'a [VNode],
        direction: Axis,
        inner: Rect,
    ) -> Result<Vec<LayoutTree<'a>>, Fatal> {
        let panels = children
            .iter()
            .map(|child| match &child.props {
                Props::ResizablePanel(p) => Ok(p),
                _ => Err(Fatal::new(
                    FatalCode::InvalidNesting,
                    format!("panelGroup child is {}", child.kind()),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let percents = resolve_panel_sizes(&panels);
        let mut cells = self.pool.take(children.len());
        distribute_integer_into(direction.main_of(inner.w, inner.h), &percents, &mut cells);

        let (main_origin, cross_origin) = direction.to_wh(inner.x, inner.y);
        let cross = direction.cross_of(inner.w, inner.h);
        let mut pos = i64::from(main_origin);
        let mut out = Vec::with_capacity(children.len());
        let mut result = Ok(());
        for (i, child) in children.iter().enumerate() {
            let placed = to_i32(pos, "panel offset").and_then(|main_pos| {
                let (x, y) = direction.to_wh(main_pos, cross_origin);
                let (w, h) = direction.to_wh(cells[i], cross);
                self.arrange(child, Rect::new(x, y, w, h))
            });
            match placed {
                Ok(tree) => out.push(tree),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
            pos += i64::from(cells[i]);
        }
        self.pool.give_back(cells);
        result.map(|()| out)
    }

    /// Move dropdowns next to their anchors.
    fn place_overlays<'a>(&mut self, tree: &mut LayoutTree<'a>, viewport: Rect) {
        fn collect<'a>(tree: &LayoutTree<'a>, ids: &mut HashMap<&'a str, Rect>, overlays: &mut usize) {
            if let Some(id) = tree.node.id.as_deref() {
                ids.entry(id).or_insert(tree.rect);
            }
            if matches!(tree.node.props, Props::Dropdown(_)) {
                *overlays += 1;
            }
            for child in &tree.children {
                collect(child, ids, overlays);
            }
        }

        fn apply(tree: &mut LayoutTree<'_>, ids: &HashMap<&str, Rect>, viewport: Rect, placed: &mut usize) {
            if let Props::Dropdown(p) = &tree.node.props {
                match ids.get(p.anchor_id.as_str()) {
                    Some(anchor) => {
                        tree.rect = dropdown_rect(*anchor, &p.items, p.position, viewport);
                        *placed += 1;
                    }
                    None => tracing::debug!(anchor = %p.anchor_id, "dropdown anchor not found"),
                }
            }
            for child in &mut tree.children {
                apply(child, ids, viewport, placed);
            }
        }

        let mut ids = HashMap::new();
        let mut overlays = 0;
        collect(tree, &mut ids, &mut overlays);
        if overlays == 0 {
            return;
        }
        let mut placed = 0;
        apply(tree, &ids, viewport, &mut placed);
        self.stats.overlays = placed;
    }
}
