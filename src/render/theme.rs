//! Default styles consulted while encoding.
//!
//! Node props always win over the theme; the theme only fills fields a
//! node leaves unset.

use crate::drawlist::{Rgb, TextStyle};

/// Resolved palette.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Screen background, used for the frame clear.
    pub base: TextStyle,
    /// Plain and rich text.
    pub text: TextStyle,
    /// Box borders.
    pub border: TextStyle,
    /// Box titles.
    pub title: TextStyle,
    /// Enabled buttons.
    pub button: TextStyle,
    /// The focused button or focusable box.
    pub focused: TextStyle,
    /// Disabled buttons.
    pub button_disabled: TextStyle,
    /// Dropdown frame and items.
    pub dropdown: TextStyle,
    /// Highlighted dropdown item.
    pub dropdown_selected: TextStyle,
    /// Disabled dropdown items.
    pub dropdown_disabled: TextStyle,
    /// Placeholder for content the target drawlist version cannot carry.
    pub placeholder: TextStyle,
}

impl Default for Theme {
    fn default() -> Self {
        let fg = Rgb::new(220, 220, 220);
        let bg = Rgb::new(24, 24, 28);
        let accent = Rgb::new(90, 160, 255);
        let muted = Rgb::new(120, 120, 130);
        Self {
            base: TextStyle {
                fg: Some(fg),
                bg: Some(bg),
                ..TextStyle::default()
            },
            text: TextStyle::fg(fg),
            border: TextStyle::fg(muted),
            title: TextStyle {
                fg: Some(fg),
                bold: Some(true),
                ..TextStyle::default()
            },
            button: TextStyle {
                fg: Some(fg),
                bg: Some(Rgb::new(50, 50, 60)),
                ..TextStyle::default()
            },
            focused: TextStyle {
                fg: Some(bg),
                bg: Some(accent),
                bold: Some(true),
                ..TextStyle::default()
            },
            button_disabled: TextStyle {
                fg: Some(muted),
                dim: Some(true),
                ..TextStyle::default()
            },
            dropdown: TextStyle {
                fg: Some(fg),
                bg: Some(Rgb::new(36, 36, 44)),
                ..TextStyle::default()
            },
            dropdown_selected: TextStyle {
                fg: Some(bg),
                bg: Some(accent),
                ..TextStyle::default()
            },
            dropdown_disabled: TextStyle {
                fg: Some(muted),
                dim: Some(true),
                ..TextStyle::default()
            },
            placeholder: TextStyle {
                fg: Some(muted),
                bg: Some(Rgb::new(40, 40, 40)),
                ..TextStyle::default()
            },
        }
    }
}

impl Theme {
    /// Every style empty; output carries only what nodes specify.
    pub fn plain() -> Self {
        let empty = TextStyle::default();
        Self {
            base: empty.clone(),
            text: empty.clone(),
            border: empty.clone(),
            title: empty.clone(),
            button: empty.clone(),
            focused: TextStyle {
                inverse: Some(true),
                ..TextStyle::default()
            },
            button_disabled: TextStyle {
                dim: Some(true),
                ..TextStyle::default()
            },
            dropdown: empty.clone(),
            dropdown_selected: TextStyle {
                inverse: Some(true),
                ..TextStyle::default()
            },
            dropdown_disabled: TextStyle {
                dim: Some(true),
                ..TextStyle::default()
            },
            placeholder: empty,
        }
    }
}
