//! Style: partial text styles, deterministic merging and wire packing.
//!
//! # Packed Layout
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────┬──────────┬─────────┬──────────┐
//! │    fg    │    bg    │  attrs   │ underline_color │ link_uri │ link_id │ reserved │
//! │   u32    │   u32    │   u32    │       u32       │   u32    │   u32   │   u32    │
//! └──────────┴──────────┴──────────┴─────────────────┴──────────┴─────────┴──────────┘
//! ```
//!
//! Colors pack as `0x01RRGGBB` when set and `0` for the terminal default.
//! Link fields are string-table references, `0` meaning "no link". Version
//! 1 drawlists carry only the first three words plus `reserved`.

use bitflags::bitflags;

/// True-color RGB representation.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
}

impl Rgb {
    /// Create a new RGB color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Black (0, 0, 0)
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// White (255, 255, 255)
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Create from a 24-bit hex color (e.g., 0xFF5500).
    #[inline]
    pub const fn from_u32(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// The 24-bit value `0xRRGGBB`.
    #[inline]
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl std::fmt::Debug for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    #[inline]
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl From<u32> for Rgb {
    /// Convert from a 24-bit hex color (e.g., 0xFF5500)
    #[inline]
    fn from(hex: u32) -> Self {
        Self::from_u32(hex)
    }
}

/// Marker bit set on packed colors that are not the terminal default.
pub const COLOR_SET: u32 = 0x0100_0000;

/// Pack an optional color into its wire word.
#[inline]
pub const fn pack_color(color: Option<Rgb>) -> u32 {
    match color {
        Some(rgb) => COLOR_SET | rgb.to_u32(),
        None => 0,
    }
}

/// Unpack a color wire word.
#[inline]
pub const fn unpack_color(word: u32) -> Option<Rgb> {
    if word & COLOR_SET == 0 {
        None
    } else {
        Some(Rgb::from_u32(word))
    }
}

bitflags! {
    /// Boolean text attributes, packed into the low bits of `attrs`.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attrs: u32 {
        /// Bold text
        const BOLD = 1 << 0;
        /// Dim/faint text
        const DIM = 1 << 1;
        /// Italic text
        const ITALIC = 1 << 2;
        /// Underlined text
        const UNDERLINE = 1 << 3;
        /// Blinking text
        const BLINK = 1 << 4;
        /// Reversed colors (fg/bg swapped)
        const INVERSE = 1 << 5;
        /// Strikethrough text
        const STRIKETHROUGH = 1 << 6;
        /// Overlined text
        const OVERLINE = 1 << 7;
    }
}

impl std::fmt::Debug for Attrs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

/// Shift of the underline style inside `attrs`.
const UNDERLINE_STYLE_SHIFT: u32 = 8;

/// Underline shape, stored in bits 8..11 of `attrs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnderlineStyle {
    /// Single straight line.
    Straight = 1,
    /// Two lines.
    Double = 2,
    /// Wavy line.
    Curly = 3,
    /// Dotted line.
    Dotted = 4,
    /// Dashed line.
    Dashed = 5,
}

impl UnderlineStyle {
    fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits {
            1 => Self::Straight,
            2 => Self::Double,
            3 => Self::Curly,
            4 => Self::Dotted,
            5 => Self::Dashed,
            _ => return None,
        })
    }
}

/// A hyperlink attached to styled text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    /// Target URI.
    pub uri: String,
    /// Optional grouping id so split cells render as one link.
    pub id: Option<String>,
}

/// A possibly partial text style. `None` fields are "not specified".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextStyle {
    /// Foreground color.
    pub fg: Option<Rgb>,
    /// Background color.
    pub bg: Option<Rgb>,
    /// Bold.
    pub bold: Option<bool>,
    /// Dim.
    pub dim: Option<bool>,
    /// Italic.
    pub italic: Option<bool>,
    /// Underline.
    pub underline: Option<bool>,
    /// Blink.
    pub blink: Option<bool>,
    /// Inverse video.
    pub inverse: Option<bool>,
    /// Strikethrough.
    pub strikethrough: Option<bool>,
    /// Overline.
    pub overline: Option<bool>,
    /// Underline shape.
    pub underline_style: Option<UnderlineStyle>,
    /// Underline color.
    pub underline_color: Option<Rgb>,
    /// Hyperlink.
    pub link: Option<Link>,
}

impl TextStyle {
    /// A style with only the foreground set.
    pub fn fg(color: impl Into<Rgb>) -> Self {
        Self {
            fg: Some(color.into()),
            ..Self::default()
        }
    }

    /// A style with only the background set.
    pub fn bg(color: impl Into<Rgb>) -> Self {
        Self {
            bg: Some(color.into()),
            ..Self::default()
        }
    }

    /// A style with only `bold: true`.
    pub fn bold() -> Self {
        Self {
            bold: Some(true),
            ..Self::default()
        }
    }

    /// Check if no field is specified.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `self` overlaid with every field `top` defines.
    #[must_use]
    pub fn overlaid(&self, top: &Self) -> Self {
        Self {
            fg: top.fg.or(self.fg),
            bg: top.bg.or(self.bg),
            bold: top.bold.or(self.bold),
            dim: top.dim.or(self.dim),
            italic: top.italic.or(self.italic),
            underline: top.underline.or(self.underline),
            blink: top.blink.or(self.blink),
            inverse: top.inverse.or(self.inverse),
            strikethrough: top.strikethrough.or(self.strikethrough),
            overline: top.overline.or(self.overline),
            underline_style: top.underline_style.or(self.underline_style),
            underline_color: top.underline_color.or(self.underline_color),
            link: top.link.clone().or_else(|| self.link.clone()),
        }
    }

    /// The boolean attributes as a bitmask, underline style included.
    pub fn attrs(&self) -> u32 {
        let mut attrs = Attrs::empty();
        for (flag, value) in [
            (Attrs::BOLD, self.bold),
            (Attrs::DIM, self.dim),
            (Attrs::ITALIC, self.italic),
            (Attrs::UNDERLINE, self.underline),
            (Attrs::BLINK, self.blink),
            (Attrs::INVERSE, self.inverse),
            (Attrs::STRIKETHROUGH, self.strikethrough),
            (Attrs::OVERLINE, self.overline),
        ] {
            attrs.set(flag, value == Some(true));
        }
        let shape = self.underline_style.map_or(0, |s| s as u32);
        attrs.bits() | (shape << UNDERLINE_STYLE_SHIFT)
    }
}

/// Merge partial styles left to right; for every field the last defined
/// value wins and `None` entries are skipped. Inputs are never modified.
pub fn merge_styles<'a>(styles: impl IntoIterator<Item = Option<&'a TextStyle>>) -> TextStyle {
    styles
        .into_iter()
        .flatten()
        .fold(TextStyle::default(), |acc, style| acc.overlaid(style))
}

/// Canonical on-wire style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EncodedStyle {
    /// Packed foreground.
    pub fg: u32,
    /// Packed background.
    pub bg: u32,
    /// Attribute bitmask (bits 0..8) and underline style (bits 8..11).
    pub attrs: u32,
    /// Packed underline color.
    pub underline_color: u32,
    /// String reference of the link URI, `0` for none.
    pub link_uri_ref: u32,
    /// String reference of the link id, `0` for none.
    pub link_id_ref: u32,
    /// Always zero.
    pub reserved: u32,
}

impl EncodedStyle {
    /// Pack a style. `intern` maps a string to its 1-based table reference.
    pub fn pack(style: &TextStyle, mut intern: impl FnMut(&str) -> u32) -> Self {
        let (link_uri_ref, link_id_ref) = style.link.as_ref().map_or((0, 0), |link| {
            let uri = intern(&link.uri);
            let id = link.id.as_deref().map_or(0, &mut intern);
            (uri, id)
        });
        Self {
            fg: pack_color(style.fg),
            bg: pack_color(style.bg),
            attrs: style.attrs(),
            underline_color: pack_color(style.underline_color),
            link_uri_ref,
            link_id_ref,
            reserved: 0,
        }
    }

    /// Attribute flags without the underline style bits.
    pub const fn flags(&self) -> Attrs {
        Attrs::from_bits_truncate(self.attrs & 0xFF)
    }

    /// Underline style encoded in `attrs`, if any.
    pub fn underline_style(&self) -> Option<UnderlineStyle> {
        UnderlineStyle::from_bits((self.attrs >> UNDERLINE_STYLE_SHIFT) & 0xF)
    }
}

/// Counters for style packing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleStats {
    /// Styles packed from scratch.
    pub packs: u64,
    /// Packs skipped because the style equaled the previous one.
    pub reuses: u64,
}

/// Packs styles, reusing the previous result when the input repeats.
///
/// Link references are only valid for the current frame's string table, so
/// the cache must be cleared whenever that table is.
#[derive(Debug, Clone, Default)]
pub struct StylePacker {
    last: Option<(TextStyle, EncodedStyle)>,
    stats: StyleStats,
}

impl StylePacker {
    /// Create an empty packer.
    pub const fn new() -> Self {
        Self {
            last: None,
            stats: StyleStats { packs: 0, reuses: 0 },
        }
    }

    /// Pack `style`, reusing the cached encoding when it repeats.
    pub fn pack(&mut self, style: &TextStyle, intern: impl FnMut(&str) -> u32) -> EncodedStyle {
        if let Some((last_style, packed)) = &self.last {
            if last_style == style {
                self.stats.reuses += 1;
                return *packed;
            }
        }
        let packed = EncodedStyle::pack(style, intern);
        self.stats.packs += 1;
        self.last = Some((style.clone(), packed));
        packed
    }

    /// Drop the cached style.
    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Counters since creation.
    pub const fn stats(&self) -> StyleStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_from_hex() {
        let rgb: Rgb = 0xFF8000.into();
        assert_eq!(rgb, Rgb::new(255, 128, 0));
        assert_eq!(rgb.to_u32(), 0xFF8000);
    }

    #[test]
    fn test_pack_color_distinguishes_black_from_default() {
        assert_eq!(pack_color(None), 0);
        assert_eq!(pack_color(Some(Rgb::BLACK)), COLOR_SET);
        assert_eq!(unpack_color(COLOR_SET), Some(Rgb::BLACK));
        assert_eq!(unpack_color(0), None);
    }

    #[test]
    fn test_merge_last_defined_wins() {
        let a = TextStyle {
            fg: Some(Rgb::WHITE),
            bold: Some(true),
            ..TextStyle::default()
        };
        let b = TextStyle {
            fg: Some(Rgb::BLACK),
            ..TextStyle::default()
        };
        let c = TextStyle {
            bold: Some(false),
            italic: Some(true),
            ..TextStyle::default()
        };
        let merged = merge_styles([Some(&a), Some(&b), Some(&c)]);
        assert_eq!(merged.fg, Some(Rgb::BLACK));
        assert_eq!(merged.bold, Some(false));
        assert_eq!(merged.italic, Some(true));
        assert_eq!(merged, a.overlaid(&b).overlaid(&c));
        // Inputs untouched.
        assert_eq!(a.fg, Some(Rgb::WHITE));
        assert_eq!(c.fg, None);
    }

    #[test]
    fn test_merge_skips_undefined() {
        let bold = TextStyle::bold();
        assert_eq!(merge_styles([None, Some(&bold), None]), bold);
        assert!(merge_styles([None, None]).is_empty());
    }

    #[test]
    fn test_attrs_bitmask() {
        let style = TextStyle {
            bold: Some(true),
            underline: Some(true),
            inverse: Some(false),
            underline_style: Some(UnderlineStyle::Curly),
            ..TextStyle::default()
        };
        let packed = EncodedStyle::pack(&style, |_| 0);
        assert_eq!(packed.flags(), Attrs::BOLD | Attrs::UNDERLINE);
        assert_eq!(packed.underline_style(), Some(UnderlineStyle::Curly));
    }

    #[test]
    fn test_pack_interns_links() {
        let style = TextStyle {
            link: Some(Link {
                uri: "https://example.com".into(),
                id: Some("l1".into()),
            }),
            ..TextStyle::default()
        };
        let mut seen = Vec::new();
        let packed = EncodedStyle::pack(&style, |s| {
            seen.push(s.to_owned());
            seen.len() as u32
        });
        assert_eq!(packed.link_uri_ref, 1);
        assert_eq!(packed.link_id_ref, 2);
        assert_eq!(seen, vec!["https://example.com", "l1"]);
    }

    #[test]
    fn test_packer_counts_reuse() {
        let mut packer = StylePacker::new();
        let style = TextStyle::fg(0x112233);
        let a = packer.pack(&style, |_| 0);
        let b = packer.pack(&style, |_| 0);
        assert_eq!(a, b);
        packer.pack(&TextStyle::bold(), |_| 0);
        assert_eq!(packer.stats(), StyleStats { packs: 2, reuses: 1 });
    }
}
