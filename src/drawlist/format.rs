//! Wire format: header layout, versions and opcodes.
//!
//! All integers are little-endian. A drawlist is one fixed header followed
//! by four sections, each 4-byte aligned:
//!
//! ```text
//! ┌──────────┬────────────────┬────────────────┬──────────────┬───────────────┬─────────────┐
//! │ header   │ commands       │ string spans   │ string bytes │ blob spans    │ blob bytes  │
//! │ 64 bytes │ {op,flags,len} │ {offset,len}*N │ UTF-8 arena  │ {offset,len}*M│ payloads    │
//! └──────────┴────────────────┴────────────────┴──────────────┴───────────────┴─────────────┘
//! ```
//!
//! Every command starts with an 8-byte header `{opcode: u16, flags: u16,
//! size: u32}` where `size` includes the header and padding.

/// Magic number, `"WFDL"` read as a little-endian `u32`.
pub const MAGIC: u32 = u32::from_le_bytes(*b"WFDL");

/// Header size in bytes.
pub const HEADER_SIZE: usize = 64;

/// Command header size in bytes.
pub const CMD_HEADER_SIZE: usize = 8;

/// Span record size (`offset: u32, length: u32`).
pub const SPAN_SIZE: usize = 8;

/// Drawlist format versions a builder can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DrawlistVersion {
    /// Base commands, 16-byte styles.
    V1 = 1,
    /// Extended 28-byte styles, links and blits.
    V2 = 2,
    /// Canvas and image commands.
    #[default]
    V3 = 3,
}

impl DrawlistVersion {
    /// The newest version.
    pub const LATEST: Self = Self::V3;

    /// Numeric tag written into the header.
    #[inline]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Parse a header tag.
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    /// Size of an encoded style in this version.
    #[inline]
    pub const fn style_size(self) -> usize {
        match self {
            Self::V1 => 16,
            Self::V2 | Self::V3 => 28,
        }
    }

    /// Check if `op` may appear in this version.
    pub const fn supports(self, op: Opcode) -> bool {
        self.tag() >= op.min_version().tag()
    }
}

/// Command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Clear the whole framebuffer.
    Clear = 1,
    /// Fill a rectangle with spaces in a style.
    FillRect = 2,
    /// Draw a string-table slice.
    DrawText = 3,
    /// Push a clip rectangle.
    PushClip = 4,
    /// Pop the innermost clip rectangle.
    PopClip = 5,
    /// Draw a multi-segment text run stored as a blob.
    DrawTextRun = 6,
    /// Position and shape the cursor.
    SetCursor = 7,
    /// Copy a rectangle of already drawn cells.
    BlitRect = 8,
    /// Begin or end a hyperlink.
    SetLink = 9,
    /// Draw an RGBA pixel blob through a sub-cell blitter.
    DrawCanvas = 10,
    /// Draw an image blob through a terminal graphics protocol.
    DrawImage = 11,
}

impl Opcode {
    /// Oldest version that understands this opcode.
    pub const fn min_version(self) -> DrawlistVersion {
        match self {
            Self::Clear
            | Self::FillRect
            | Self::DrawText
            | Self::PushClip
            | Self::PopClip
            | Self::DrawTextRun
            | Self::SetCursor => DrawlistVersion::V1,
            Self::BlitRect | Self::SetLink => DrawlistVersion::V2,
            Self::DrawCanvas | Self::DrawImage => DrawlistVersion::V3,
        }
    }

    /// Parse a wire opcode.
    pub const fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            1 => Self::Clear,
            2 => Self::FillRect,
            3 => Self::DrawText,
            4 => Self::PushClip,
            5 => Self::PopClip,
            6 => Self::DrawTextRun,
            7 => Self::SetCursor,
            8 => Self::BlitRect,
            9 => Self::SetLink,
            10 => Self::DrawCanvas,
            11 => Self::DrawImage,
            _ => return None,
        })
    }

    /// Stable lower-case name used in error details.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::FillRect => "fill_rect",
            Self::DrawText => "draw_text",
            Self::PushClip => "push_clip",
            Self::PopClip => "pop_clip",
            Self::DrawTextRun => "draw_text_run",
            Self::SetCursor => "set_cursor",
            Self::BlitRect => "blit_rect",
            Self::SetLink => "set_link",
            Self::DrawCanvas => "draw_canvas",
            Self::DrawImage => "draw_image",
        }
    }
}

/// Header field offsets, in bytes.
pub mod header {
    /// `u32` magic.
    pub const MAGIC: usize = 0;
    /// `u32` version tag.
    pub const VERSION: usize = 4;
    /// `u32` header size.
    pub const HEADER_SIZE: usize = 8;
    /// `u32` total size.
    pub const TOTAL_SIZE: usize = 12;
    /// `u32` commands offset.
    pub const CMD_OFFSET: usize = 16;
    /// `u32` commands byte length.
    pub const CMD_BYTES: usize = 20;
    /// `u32` command count.
    pub const CMD_COUNT: usize = 24;
    /// `u32` string spans offset.
    pub const STRINGS_SPAN_OFFSET: usize = 28;
    /// `u32` string count.
    pub const STRINGS_COUNT: usize = 32;
    /// `u32` string bytes offset.
    pub const STRINGS_BYTES_OFFSET: usize = 36;
    /// `u32` string bytes length.
    pub const STRINGS_BYTES_LEN: usize = 40;
    /// `u32` blob spans offset.
    pub const BLOBS_SPAN_OFFSET: usize = 44;
    /// `u32` blob count.
    pub const BLOBS_COUNT: usize = 48;
    /// `u32` blob bytes offset.
    pub const BLOBS_BYTES_OFFSET: usize = 52;
    /// `u32` blob bytes length.
    pub const BLOBS_BYTES_LEN: usize = 56;
    /// `u32` reserved, zero.
    pub const RESERVED: usize = 60;
}

/// Cursor shapes for [`Opcode::SetCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CursorShape {
    /// Full block.
    #[default]
    Block = 0,
    /// Underline.
    Underline = 1,
    /// Vertical bar.
    Bar = 2,
}

impl CursorShape {
    /// Parse a wire value.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Block),
            1 => Some(Self::Underline),
            2 => Some(Self::Bar),
            _ => None,
        }
    }
}

/// Sub-cell blitters for [`Opcode::DrawCanvas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Blitter {
    /// Pick the best supported blitter.
    #[default]
    Auto = 0,
    /// Upper/lower half blocks (1x2 pixels per cell).
    HalfBlock = 1,
    /// Quadrant blocks (2x2).
    Quadrant = 2,
    /// Braille dots (2x4).
    Braille = 3,
}

impl Blitter {
    /// Parse a wire value.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Auto),
            1 => Some(Self::HalfBlock),
            2 => Some(Self::Quadrant),
            3 => Some(Self::Braille),
            _ => None,
        }
    }
}

/// Image payload formats for [`Opcode::DrawImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ImageFormat {
    /// Raw RGBA8 pixels.
    #[default]
    Rgba = 0,
    /// PNG-encoded bytes.
    Png = 1,
}

impl ImageFormat {
    /// Parse a wire value.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Rgba),
            1 => Some(Self::Png),
            _ => None,
        }
    }
}

/// Round `n` up to the next multiple of four.
#[inline]
pub const fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Little-endian byte writer used to assemble drawlists.
///
/// All output is accumulated in one buffer that is cleared, not freed,
/// between frames.
#[derive(Debug, Clone, Default)]
pub struct WireWriter {
    data: Vec<u8>,
}

impl WireWriter {
    /// Create a writer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Clear the buffer for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Get the buffer contents.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get the buffer length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a `u8`.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a little-endian `u16`.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `u32`.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `i32`.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Pad with zeros to a 4-byte boundary.
    #[inline]
    pub fn pad4(&mut self) {
        let target = align4(self.data.len());
        self.data.resize(target, 0);
    }

    /// Overwrite a `u32` at `offset`.
    #[inline]
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Read a little-endian `u32` at `offset`, if in range.
#[inline]
pub fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Read a little-endian `i32` at `offset`, if in range.
#[inline]
pub fn read_i32(bytes: &[u8], offset: usize) -> Option<i32> {
    read_u32(bytes, offset).map(|v| v as i32)
}

/// Read a little-endian `u16` at `offset`, if in range.
#[inline]
pub fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}
