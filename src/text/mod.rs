//! Text module: Pinned cell-width measurement, wrapping and truncation.
//!
//! Layout and the drawlist encoder both size text through this module, so
//! the two always agree on how many cells a run occupies.

mod width;
mod wrap;

pub use width::{
    char_width, grapheme_width, text_width, text_width_bytes, text_width_utf16,
    TEXT_MEASURE_VERSION,
};
pub use wrap::{truncate, wrap, wrapped_size, TextOverflow};
