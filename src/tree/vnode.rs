//! VNode: the immutable declarative tree handed to each frame.
//!
//! Every node kind carries its own props struct. Reuse decisions compare
//! only the fields that affect what a node renders, through
//! [`Props::reuse_eq`], so callbacks and other inert data can change
//! without forcing a fresh instance.

use std::collections::HashSet;
use std::sync::Arc;

use crate::drawlist::{Blitter, ImageFormat, TextStyle};
use crate::error::{Fatal, FatalCode};
use crate::layout::{Align, Axis, Justify, OverlayPosition, Size, Spacing};
use crate::text::TextOverflow;

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Bordered container stacking children vertically.
    Box,
    /// Plain text.
    Text,
    /// Horizontal stack.
    Row,
    /// Vertical stack.
    Column,
    /// Children stacked on top of each other.
    Layers,
    /// Pressable label.
    Button,
    /// Empty space.
    Spacer,
    /// Container of resizable panels.
    PanelGroup,
    /// One panel of a panel group.
    ResizablePanel,
    /// Anchored item list drawn above other content.
    Dropdown,
    /// Single line of differently styled spans.
    RichText,
    /// RGBA pixel canvas.
    Canvas,
    /// Encoded image.
    Image,
}

impl NodeKind {
    /// Lower-case name used in error details.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Text => "text",
            Self::Row => "row",
            Self::Column => "column",
            Self::Layers => "layers",
            Self::Button => "button",
            Self::Spacer => "spacer",
            Self::PanelGroup => "panelGroup",
            Self::ResizablePanel => "resizablePanel",
            Self::Dropdown => "dropdown",
            Self::RichText => "richText",
            Self::Canvas => "canvas",
            Self::Image => "image",
        }
    }

    /// Check if this kind never has children.
    pub const fn is_leaf(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::Button
                | Self::Spacer
                | Self::Dropdown
                | Self::RichText
                | Self::Canvas
                | Self::Image
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sizing and spacing shared by most kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutProps {
    /// Requested width.
    pub width: Size,
    /// Requested height.
    pub height: Size,
    /// Lower width bound.
    pub min_width: Option<i32>,
    /// Upper width bound.
    pub max_width: Option<i32>,
    /// Lower height bound.
    pub min_height: Option<i32>,
    /// Upper height bound.
    pub max_height: Option<i32>,
    /// Share of free main-axis space to grow into.
    pub flex: f64,
    /// Share of a main-axis deficit to give up, scaled by size.
    pub flex_shrink: f64,
    /// Inner spacing.
    pub padding: Spacing,
    /// Outer spacing.
    pub margin: Spacing,
}

impl LayoutProps {
    /// Auto size, no flex growth, shrinkable, no spacing.
    pub const DEFAULT: Self = Self {
        width: Size::Auto,
        height: Size::Auto,
        min_width: None,
        max_width: None,
        min_height: None,
        max_height: None,
        flex: 0.0,
        flex_shrink: 1.0,
        padding: Spacing::NONE,
        margin: Spacing::NONE,
    };

    /// Fixed size in cells.
    pub const fn fixed(width: i32, height: i32) -> Self {
        Self {
            width: Size::Cells(width),
            height: Size::Cells(height),
            ..Self::DEFAULT
        }
    }

    /// Grow with `flex`.
    pub const fn flex(flex: f64) -> Self {
        Self {
            flex,
            ..Self::DEFAULT
        }
    }
}

impl Default for LayoutProps {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Box border styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Border {
    /// No border.
    #[default]
    None,
    /// `┌─┐`
    Single,
    /// `╔═╗`
    Double,
    /// `╭─╮`
    Rounded,
    /// `┏━┓`
    Heavy,
}

impl Border {
    /// Cells taken on each side.
    pub const fn thickness(self) -> i32 {
        match self {
            Self::None => 0,
            _ => 1,
        }
    }
}

/// Props for [`NodeKind::Box`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxProps {
    /// Sizing.
    pub layout: LayoutProps,
    /// Border style.
    pub border: Border,
    /// Title drawn into the top border.
    pub title: Option<String>,
    /// Fill style.
    pub style: Option<TextStyle>,
    /// Border style override.
    pub border_style: Option<TextStyle>,
    /// Rows between children.
    pub gap: i32,
    /// Whether the box takes focus and pointer hits.
    pub focusable: bool,
}

/// Props for [`NodeKind::Row`] and [`NodeKind::Column`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackProps {
    /// Sizing.
    pub layout: LayoutProps,
    /// Cells between children on the main axis.
    pub gap: i32,
    /// Cells between wrapped lines.
    pub line_gap: i32,
    /// Whether children wrap onto new lines.
    pub wrap: bool,
    /// Cross-axis alignment.
    pub align: Align,
    /// Main-axis distribution of free space.
    pub justify: Justify,
    /// Fill style.
    pub style: Option<TextStyle>,
}

/// Props for [`NodeKind::Layers`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayersProps {
    /// Sizing.
    pub layout: LayoutProps,
}

/// Props for [`NodeKind::Text`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextProps {
    /// Content, possibly with hard line breaks.
    pub content: String,
    /// Sizing.
    pub layout: LayoutProps,
    /// Text style.
    pub style: Option<TextStyle>,
    /// How lines wider than the node are shortened.
    pub overflow: TextOverflow,
    /// Whether to word-wrap at the node width.
    pub wrap: bool,
}

/// Props for [`NodeKind::Button`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ButtonProps {
    /// Label.
    pub label: String,
    /// Sizing.
    pub layout: LayoutProps,
    /// Label style.
    pub style: Option<TextStyle>,
    /// Disabled buttons are drawn dimmed and never hit.
    pub disabled: bool,
    /// Action name dispatched on press. Not part of reuse equality.
    pub action: Option<String>,
}

/// Props for [`NodeKind::Spacer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacerProps {
    /// Main-axis basis in cells.
    pub size: i32,
    /// Growth share.
    pub flex: f64,
}

impl Default for SpacerProps {
    fn default() -> Self {
        Self { size: 0, flex: 1.0 }
    }
}

/// Props for [`NodeKind::PanelGroup`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelGroupProps {
    /// Sizing.
    pub layout: LayoutProps,
    /// Axis the panels are laid along.
    pub direction: Axis,
}

/// Props for [`NodeKind::ResizablePanel`]. Sizes are percentages of the
/// group.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanelProps {
    /// Initial share; unset panels split what is left.
    pub default_size: Option<f64>,
    /// Lower bound.
    pub min_size: Option<f64>,
    /// Upper bound.
    pub max_size: Option<f64>,
}

/// One dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropdownItem {
    /// Label.
    pub label: String,
    /// Right-aligned hint.
    pub shortcut: Option<String>,
    /// Disabled items are drawn dimmed.
    pub disabled: bool,
}

impl DropdownItem {
    /// Item with just a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// Props for [`NodeKind::Dropdown`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DropdownProps {
    /// Id of the node the list is anchored to.
    pub anchor_id: String,
    /// Entries.
    pub items: Vec<DropdownItem>,
    /// Highlighted entry.
    pub selected: Option<usize>,
    /// Preferred side of the anchor.
    pub position: OverlayPosition,
    /// Frame and item style.
    pub style: Option<TextStyle>,
}

/// One span of rich text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RichSpan {
    /// Text.
    pub text: String,
    /// Style layered over the node style.
    pub style: TextStyle,
}

/// Props for [`NodeKind::RichText`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RichTextProps {
    /// Spans, drawn left to right on one line.
    pub spans: Vec<RichSpan>,
    /// Sizing.
    pub layout: LayoutProps,
}

/// Props for [`NodeKind::Canvas`].
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasProps {
    /// Sizing. Auto sizes come from the pixel size.
    pub layout: LayoutProps,
    /// Width in pixels.
    pub px_width: u32,
    /// Height in pixels.
    pub px_height: u32,
    /// RGBA8 pixels, `px_width * px_height * 4` bytes.
    pub pixels: Arc<[u8]>,
    /// Sub-cell blitter.
    pub blitter: Blitter,
}

/// Props for [`NodeKind::Image`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageProps {
    /// Sizing. Auto sizes come from the pixel size.
    pub layout: LayoutProps,
    /// Encoded bytes.
    pub data: Arc<[u8]>,
    /// Encoding of `data`.
    pub format: ImageFormat,
    /// Width in pixels.
    pub px_width: u32,
    /// Height in pixels.
    pub px_height: u32,
    /// Stable id for protocols that keep images resident.
    pub image_id: u32,
}

impl CanvasProps {
    /// Canvas over `pixels` with auto size.
    pub fn new(px_width: u32, px_height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            layout: LayoutProps::DEFAULT,
            px_width,
            px_height,
            pixels: pixels.into(),
            blitter: Blitter::Auto,
        }
    }
}

impl ImageProps {
    /// Image over `data` with auto size.
    pub fn new(format: ImageFormat, px_width: u32, px_height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            layout: LayoutProps::DEFAULT,
            data: data.into(),
            format,
            px_width,
            px_height,
            image_id: 0,
        }
    }
}

/// Kind-specific props.
#[derive(Debug, Clone, PartialEq)]
pub enum Props {
    /// See [`BoxProps`].
    Box(BoxProps),
    /// See [`TextProps`].
    Text(TextProps),
    /// See [`StackProps`].
    Row(StackProps),
    /// See [`StackProps`].
    Column(StackProps),
    /// See [`LayersProps`].
    Layers(LayersProps),
    /// See [`ButtonProps`].
    Button(ButtonProps),
    /// See [`SpacerProps`].
    Spacer(SpacerProps),
    /// See [`PanelGroupProps`].
    PanelGroup(PanelGroupProps),
    /// See [`PanelProps`].
    ResizablePanel(PanelProps),
    /// See [`DropdownProps`].
    Dropdown(DropdownProps),
    /// See [`RichTextProps`].
    RichText(RichTextProps),
    /// See [`CanvasProps`].
    Canvas(CanvasProps),
    /// See [`ImageProps`].
    Image(ImageProps),
}

macro_rules! props_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Props {
                fn from(props: $ty) -> Self {
                    Self::$variant(props)
                }
            }
        )*
    };
}

props_from!(
    Box(BoxProps),
    Text(TextProps),
    Layers(LayersProps),
    Button(ButtonProps),
    Spacer(SpacerProps),
    PanelGroup(PanelGroupProps),
    ResizablePanel(PanelProps),
    Dropdown(DropdownProps),
    RichText(RichTextProps),
    Canvas(CanvasProps),
    Image(ImageProps),
);

impl Props {
    /// Kind tag.
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Box(_) => NodeKind::Box,
            Self::Text(_) => NodeKind::Text,
            Self::Row(_) => NodeKind::Row,
            Self::Column(_) => NodeKind::Column,
            Self::Layers(_) => NodeKind::Layers,
            Self::Button(_) => NodeKind::Button,
            Self::Spacer(_) => NodeKind::Spacer,
            Self::PanelGroup(_) => NodeKind::PanelGroup,
            Self::ResizablePanel(_) => NodeKind::ResizablePanel,
            Self::Dropdown(_) => NodeKind::Dropdown,
            Self::RichText(_) => NodeKind::RichText,
            Self::Canvas(_) => NodeKind::Canvas,
            Self::Image(_) => NodeKind::Image,
        }
    }

    /// Sizing props. Kinds without their own use [`LayoutProps::DEFAULT`].
    pub fn layout(&self) -> &LayoutProps {
        match self {
            Self::Box(p) => &p.layout,
            Self::Text(p) => &p.layout,
            Self::Row(p) | Self::Column(p) => &p.layout,
            Self::Layers(p) => &p.layout,
            Self::Button(p) => &p.layout,
            Self::PanelGroup(p) => &p.layout,
            Self::RichText(p) => &p.layout,
            Self::Canvas(p) => &p.layout,
            Self::Image(p) => &p.layout,
            Self::Spacer(_) | Self::ResizablePanel(_) | Self::Dropdown(_) => &LayoutProps::DEFAULT,
        }
    }

    /// Compare the fields that affect rendered output.
    ///
    /// Kinds differing always compare unequal. Children are never part of
    /// the comparison.
    pub fn reuse_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Box(a), Self::Box(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => {
                a.content == b.content
                    && a.overflow == b.overflow
                    && a.wrap == b.wrap
                    && a.style == b.style
                    && a.layout == b.layout
            }
            (Self::Row(a), Self::Row(b)) | (Self::Column(a), Self::Column(b)) => a == b,
            (Self::Layers(a), Self::Layers(b)) => a == b,
            (Self::Button(a), Self::Button(b)) => {
                a.label == b.label
                    && a.disabled == b.disabled
                    && a.style == b.style
                    && a.layout == b.layout
            }
            (Self::Spacer(a), Self::Spacer(b)) => a == b,
            (Self::PanelGroup(a), Self::PanelGroup(b)) => a == b,
            (Self::ResizablePanel(a), Self::ResizablePanel(b)) => a == b,
            (Self::Dropdown(a), Self::Dropdown(b)) => a == b,
            (Self::RichText(a), Self::RichText(b)) => a == b,
            (Self::Canvas(a), Self::Canvas(b)) => {
                a.px_width == b.px_width
                    && a.px_height == b.px_height
                    && a.blitter == b.blitter
                    && a.layout == b.layout
                    && (Arc::ptr_eq(&a.pixels, &b.pixels) || a.pixels == b.pixels)
            }
            (Self::Image(a), Self::Image(b)) => {
                a.format == b.format
                    && a.px_width == b.px_width
                    && a.px_height == b.px_height
                    && a.image_id == b.image_id
                    && a.layout == b.layout
                    && (Arc::ptr_eq(&a.data, &b.data) || a.data == b.data)
            }
            _ => false,
        }
    }
}

/// A declarative tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct VNode {
    /// Kind-specific props.
    pub props: Props,
    /// Identity hint, unique among siblings.
    pub id: Option<String>,
    /// Reconciliation hint; keyed siblings match by key instead of index.
    pub key: Option<String>,
    /// Ordered children.
    pub children: Vec<VNode>,
}

impl VNode {
    /// Create a childless node.
    pub fn new(props: impl Into<Props>) -> Self {
        Self {
            props: props.into(),
            id: None,
            key: None,
            children: Vec::new(),
        }
    }

    /// Plain text.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(TextProps {
            content: content.into(),
            ..TextProps::default()
        })
    }

    /// Horizontal stack.
    pub fn row(children: Vec<Self>) -> Self {
        Self::new(Props::Row(StackProps::default())).with_children(children)
    }

    /// Vertical stack.
    pub fn column(children: Vec<Self>) -> Self {
        Self::new(Props::Column(StackProps::default())).with_children(children)
    }

    /// Box with children.
    pub fn boxed(props: BoxProps, children: Vec<Self>) -> Self {
        Self::new(props).with_children(children)
    }

    /// Overlapping layers.
    pub fn layers(children: Vec<Self>) -> Self {
        Self::new(LayersProps::default()).with_children(children)
    }

    /// Button with a label.
    pub fn button(label: impl Into<String>) -> Self {
        Self::new(ButtonProps {
            label: label.into(),
            ..ButtonProps::default()
        })
    }

    /// Flexible empty space.
    pub fn spacer() -> Self {
        Self::new(SpacerProps::default())
    }

    /// Panel group along `direction`.
    pub fn panel_group(direction: Axis, panels: Vec<Self>) -> Self {
        Self::new(PanelGroupProps {
            direction,
            ..PanelGroupProps::default()
        })
        .with_children(panels)
    }

    /// One resizable panel.
    pub fn panel(props: PanelProps, children: Vec<Self>) -> Self {
        Self::new(props).with_children(children)
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Replace the children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    /// Kind tag.
    #[inline]
    pub const fn kind(&self) -> NodeKind {
        self.props.kind()
    }

    /// Whether the node takes focus and pointer hits.
    pub const fn is_focusable(&self) -> bool {
        match &self.props {
            Props::Button(p) => !p.disabled,
            Props::Box(p) => p.focusable,
            Props::Dropdown(_) => true,
            _ => false,
        }
    }

    /// Number of nodes in this subtree.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }

    /// Check structure and numeric props of the whole subtree.
    pub fn validate(&self) -> Result<(), Fatal> {
        let mut path = Vec::new();
        self.validate_at(None, &mut path)
    }

    fn validate_at(
        &self,
        parent: Option<NodeKind>,
        path: &mut Vec<(NodeKind, usize)>,
    ) -> Result<(), Fatal> {
        let kind = self.kind();
        let fail = |code: FatalCode, what: String, path: &[(NodeKind, usize)]| {
            Err(Fatal::new(code, format!("{what} at {}", format_path(path, kind))))
        };

        if kind.is_leaf() && !self.children.is_empty() {
            return fail(
                FatalCode::InvalidNesting,
                format!("{kind} cannot contain children"),
                path,
            );
        }
        match (parent, kind) {
            (Some(NodeKind::PanelGroup), NodeKind::ResizablePanel) => {}
            (Some(NodeKind::PanelGroup), _) => {
                return fail(
                    FatalCode::InvalidNesting,
                    format!("panelGroup children must be resizablePanel, found {kind}"),
                    path,
                );
            }
            (_, NodeKind::ResizablePanel) => {
                return fail(
                    FatalCode::InvalidNesting,
                    "resizablePanel must be a direct child of panelGroup".to_owned(),
                    path,
                );
            }
            _ => {}
        }
        if let Err(what) = check_numbers(&self.props) {
            return fail(FatalCode::InvalidProps, what, path);
        }

        let mut ids = HashSet::new();
        for (index, child) in self.children.iter().enumerate() {
            if let Some(id) = child.id.as_deref() {
                if !ids.insert(id) {
                    path.push((child.kind(), index));
                    let err = fail(
                        FatalCode::DuplicateId,
                        format!("duplicate sibling id {id:?}"),
                        path,
                    );
                    path.pop();
                    return err;
                }
            }
            path.push((child.kind(), index));
            child.validate_at(Some(kind), path)?;
            path.pop();
        }
        Ok(())
    }
}

fn format_path(path: &[(NodeKind, usize)], leaf: NodeKind) -> String {
    if path.is_empty() {
        return format!("root {leaf}");
    }
    path.iter()
        .map(|(kind, index)| format!("{kind}[{index}]"))
        .collect::<Vec<_>>()
        .join(" > ")
}

fn check_size(name: &str, size: Size) -> Result<(), String> {
    match size {
        Size::Auto => Ok(()),
        Size::Cells(n) if n < 0 => Err(format!("{name} is negative ({n})")),
        Size::Cells(_) => Ok(()),
        Size::Percent(p) if !p.is_finite() || p < 0.0 => Err(format!("{name} is {p}%")),
        Size::Percent(_) => Ok(()),
    }
}

fn check_weight(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{name} is {value}"))
    }
}

fn check_cells(name: &str, value: Option<i32>) -> Result<(), String> {
    match value {
        Some(n) if n < 0 => Err(format!("{name} is negative ({n})")),
        _ => Ok(()),
    }
}

fn check_layout(layout: &LayoutProps) -> Result<(), String> {
    check_size("width", layout.width)?;
    check_size("height", layout.height)?;
    check_cells("minWidth", layout.min_width)?;
    check_cells("maxWidth", layout.max_width)?;
    check_cells("minHeight", layout.min_height)?;
    check_cells("maxHeight", layout.max_height)?;
    check_weight("flex", layout.flex)?;
    check_weight("flexShrink", layout.flex_shrink)
}

fn check_percent(name: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(p) if !p.is_finite() || !(0.0..=100.0).contains(&p) => {
            Err(format!("{name} is {p}, expected 0..=100"))
        }
        _ => Ok(()),
    }
}

fn check_numbers(props: &Props) -> Result<(), String> {
    check_layout(props.layout())?;
    match props {
        Props::Box(p) => check_cells("gap", Some(p.gap)),
        Props::Row(p) | Props::Column(p) => {
            check_cells("gap", Some(p.gap))?;
            check_cells("lineGap", Some(p.line_gap))
        }
        Props::Spacer(p) => {
            check_cells("size", Some(p.size))?;
            check_weight("flex", p.flex)
        }
        Props::ResizablePanel(p) => {
            check_percent("defaultSize", p.default_size)?;
            check_percent("minSize", p.min_size)?;
            check_percent("maxSize", p.max_size)
        }
        Props::Canvas(p) => {
            let expected = u64::from(p.px_width) * u64::from(p.px_height) * 4;
            if p.pixels.len() as u64 == expected {
                Ok(())
            } else {
                Err(format!(
                    "canvas has {} pixel bytes, expected {expected}",
                    p.pixels.len()
                ))
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_with_children_is_invalid_nesting() {
        let tree = VNode::text("x").with_children(vec![VNode::text("y")]);
        let err = tree.validate().unwrap_err();
        assert_eq!(err.code, FatalCode::InvalidNesting);
    }

    #[test]
    fn test_duplicate_sibling_ids() {
        let tree = VNode::column(vec![
            VNode::text("a").with_id("same"),
            VNode::text("b").with_id("same"),
        ]);
        let err = tree.validate().unwrap_err();
        assert_eq!(err.code, FatalCode::DuplicateId);
        assert!(err.detail.contains("same"));
    }

    #[test]
    fn test_same_id_in_different_parents_is_fine() {
        let tree = VNode::column(vec![
            VNode::row(vec![VNode::text("a").with_id("x")]),
            VNode::row(vec![VNode::text("b").with_id("x")]),
        ]);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_non_finite_flex() {
        let tree = VNode::new(TextProps {
            layout: LayoutProps::flex(f64::NAN),
            ..TextProps::default()
        });
        assert_eq!(tree.validate().unwrap_err().code, FatalCode::InvalidProps);
    }

    #[test]
    fn test_panel_nesting() {
        let bad = VNode::panel_group(Axis::Horizontal, vec![VNode::text("x")]);
        assert_eq!(bad.validate().unwrap_err().code, FatalCode::InvalidNesting);

        let orphan = VNode::column(vec![VNode::panel(PanelProps::default(), vec![])]);
        assert_eq!(orphan.validate().unwrap_err().code, FatalCode::InvalidNesting);
    }

    #[test]
    fn test_reuse_eq_ignores_button_action() {
        let a = Props::Button(ButtonProps {
            label: "ok".into(),
            action: Some("save".into()),
            ..ButtonProps::default()
        });
        let b = Props::Button(ButtonProps {
            label: "ok".into(),
            action: Some("submit".into()),
            ..ButtonProps::default()
        });
        assert!(a.reuse_eq(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_reuse_eq_text_overflow() {
        let plain = VNode::text("hello");
        let mut ellipsis = VNode::text("hello");
        if let Props::Text(p) = &mut ellipsis.props {
            p.overflow = TextOverflow::Ellipsis;
        }
        assert!(!plain.props.reuse_eq(&ellipsis.props));
        assert!(!plain.props.reuse_eq(&VNode::button("hello").props));
    }
}
