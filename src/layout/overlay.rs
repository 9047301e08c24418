//! Anchored overlay geometry for dropdowns and tooltips.
//!
//! ```text
//!   AboveStart ┌────┐        ┌────┐ AboveEnd
//!              └────┘        └────┘
//!              ┌─────────────────┐
//!              │     anchor      │
//!              └─────────────────┘
//!   BelowStart ┌────┐        ┌────┐ BelowEnd
//!              └────┘        └────┘
//! ```
//!
//! The preferred side flips when the overlay would be clipped there, then
//! the result is clamped into the viewport.

use super::rect::Rect;
use crate::text::text_width;
use crate::tree::DropdownItem;

/// Cells reserved right of the widest item for the scrollbar.
pub const SCROLLBAR_GUTTER: i32 = 1;

/// Smallest overlay edge: room for both borders.
pub const MIN_OVERLAY_SIDE: i32 = 2;

/// Preferred placement relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverlayPosition {
    /// Under the anchor, left edges aligned.
    #[default]
    BelowStart,
    /// Under the anchor, right edges aligned.
    BelowEnd,
    /// Over the anchor, left edges aligned.
    AboveStart,
    /// Over the anchor, right edges aligned.
    AboveEnd,
}

impl OverlayPosition {
    const fn is_below(self) -> bool {
        matches!(self, Self::BelowStart | Self::BelowEnd)
    }

    const fn is_start(self) -> bool {
        matches!(self, Self::BelowStart | Self::AboveStart)
    }
}

/// Place a `w x h` overlay next to `anchor` inside `viewport`.
///
/// Sizes are clamped to the viewport first. The vertical side flips when
/// the preferred side would clip and the other side has room; the same
/// applies horizontally.
pub fn anchored_rect(
    anchor: Rect,
    w: i32,
    h: i32,
    position: OverlayPosition,
    viewport: Rect,
) -> Rect {
    let w = w.clamp(0, viewport.w.max(0));
    let h = h.clamp(0, viewport.h.max(0));

    let below = anchor.bottom();
    let above = anchor.y.saturating_sub(h);
    let fits_below = below.saturating_add(h) <= viewport.bottom();
    let fits_above = above >= viewport.y;
    let y = match (position.is_below(), fits_below, fits_above) {
        (true, false, true) => above,
        (true, _, _) => below,
        (false, true, false) => below,
        (false, _, _) => above,
    };

    let start = anchor.x;
    let end = anchor.right().saturating_sub(w);
    let fits_start = start.saturating_add(w) <= viewport.right();
    let fits_end = end >= viewport.x;
    let x = match (position.is_start(), fits_start, fits_end) {
        (true, false, true) => end,
        (true, _, _) => start,
        (false, true, false) => start,
        (false, _, _) => end,
    };

    let x = x.clamp(viewport.x, (viewport.right() - w).max(viewport.x));
    let y = y.clamp(viewport.y, (viewport.bottom() - h).max(viewport.y));
    Rect::new(x, y, w, h)
}

/// Outer size of a dropdown: widest item plus the scrollbar gutter and
/// borders, one row per item plus borders, never below 2x2.
pub fn dropdown_size(items: &[DropdownItem]) -> (i32, i32) {
    let widest = items
        .iter()
        .map(|item| {
            let label = text_width(&item.label);
            let shortcut = item.shortcut.as_deref().map_or(0, |s| text_width(s) + 1);
            label + shortcut
        })
        .max()
        .unwrap_or(0);
    let content_w = i32::try_from(widest).unwrap_or(i32::MAX - 3) + SCROLLBAR_GUTTER;
    let rows = i32::try_from(items.len()).unwrap_or(i32::MAX - 2);
    (
        MIN_OVERLAY_SIDE.max(content_w + 2),
        MIN_OVERLAY_SIDE.max(rows + 2),
    )
}

/// Dropdown rectangle for `items` anchored at `anchor`.
pub fn dropdown_rect(
    anchor: Rect,
    items: &[DropdownItem],
    position: OverlayPosition,
    viewport: Rect,
) -> Rect {
    let (w, h) = dropdown_size(items);
    anchored_rect(anchor, w, h, position, viewport)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<DropdownItem> {
        (0..n).map(|i| DropdownItem::new(format!("{i:04}"))).collect()
    }

    #[test]
    fn test_many_items_clamp_to_viewport() {
        let viewport = Rect::from_size(40, 20);
        let rect = dropdown_rect(Rect::new(0, 0, 10, 1), &items(30), OverlayPosition::BelowStart, viewport);
        assert_eq!(rect.h, 20);
        assert_eq!(rect.w, 7);
        assert_eq!(rect.y, 0);
    }

    #[test]
    fn test_empty_list_minimum() {
        let viewport = Rect::from_size(40, 20);
        let rect = dropdown_rect(Rect::new(3, 2, 4, 1), &[], OverlayPosition::BelowStart, viewport);
        assert_eq!(rect, Rect::new(3, 3, 3, 2));
    }

    #[test]
    fn test_flips_above_near_bottom() {
        let viewport = Rect::from_size(40, 20);
        let rect = dropdown_rect(Rect::new(5, 18, 6, 1), &items(3), OverlayPosition::BelowStart, viewport);
        assert_eq!(rect.h, 5);
        assert_eq!(rect.y, 13);
        assert_eq!(rect.bottom(), 18);
    }

    #[test]
    fn test_flips_to_end_near_right_edge() {
        let viewport = Rect::from_size(20, 10);
        let rect = anchored_rect(Rect::new(15, 0, 5, 1), 8, 3, OverlayPosition::BelowStart, viewport);
        assert_eq!(rect, Rect::new(12, 1, 8, 3));
    }

    #[test]
    fn test_shortcut_widens() {
        let item = DropdownItem {
            label: "Open".into(),
            shortcut: Some("^O".into()),
            disabled: false,
        };
        assert_eq!(dropdown_size(&[item]), (4 + 3 + 1 + 2, 3));
    }
}
