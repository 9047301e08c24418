//! Drawlist module: the binary command stream handed to the terminal engine.
//!
//! A drawlist is produced once per frame by a [`DrawlistBuilder`]. Text is
//! interned into one arena, styles are packed into fixed-width records and
//! larger payloads (text runs, canvases, images) live in a blob table.
//!
//! # Example
//!
//! ```
//! use weft::drawlist::{Builder, DrawlistBuilder, DrawlistVersion, TextStyle};
//!
//! let mut builder = Builder::new(DrawlistVersion::V3);
//! builder.clear_to(10, 2, &TextStyle::default());
//! builder.draw_text(0, 0, "hello", &TextStyle::bold());
//! let bytes = builder.build().unwrap();
//! assert!(!bytes.is_empty());
//! ```

mod builder;
pub mod format;
mod parse;
mod style;

pub use builder::{
    Builder, CursorState, DrawlistBuilder, DrawlistLimits, DrawlistStats, ImageParams,
    TextRunSegment,
};
pub use format::{Blitter, CursorShape, DrawlistVersion, ImageFormat, Opcode};
pub use parse::{decode_text_run, parse, Command, ParsedDrawlist, RunSegment};
pub use style::{
    merge_styles, pack_color, unpack_color, Attrs, EncodedStyle, Link, Rgb, StylePacker,
    StyleStats, TextStyle, UnderlineStyle, COLOR_SET,
};

/// Create a builder for `version` with `limits`.
pub fn create_builder(version: DrawlistVersion, limits: DrawlistLimits) -> Builder {
    Builder::with_limits(version, limits)
}
