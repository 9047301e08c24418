//! Drawlist builder: accumulates commands and resources, then serializes.
//!
//! Builders are long-lived. [`DrawlistBuilder::reset`] drops the frame's
//! commands, strings, blobs and clip stack but keeps every backing buffer,
//! so steady-state frames reuse their memory.
//!
//! Errors are sticky: the first invalid operation is recorded and
//! reported by [`DrawlistBuilder::build`]; later operations are ignored
//! until the next reset. No operation panics on bad input.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use super::format::{
    align4, header, Blitter, CursorShape, DrawlistVersion, ImageFormat, Opcode, WireWriter,
    HEADER_SIZE, MAGIC,
};
use super::style::{EncodedStyle, Link, StylePacker, StyleStats, TextStyle};
use crate::buffer::{TextArena, TextSlice};
use crate::error::{DrawlistError, DrawlistErrorCode};
use crate::layout::Rect;

/// Resource and size limits for one drawlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawlistLimits {
    /// Maximum serialized size in bytes.
    pub max_total_bytes: usize,
    /// Maximum number of commands.
    pub max_cmds: u32,
    /// Maximum number of interned strings.
    pub max_strings: u32,
    /// Maximum number of blobs.
    pub max_blobs: u32,
    /// Maximum total blob payload bytes.
    pub max_blob_bytes: usize,
    /// Maximum clip stack depth.
    pub max_clip_depth: usize,
    /// Maximum segments in one text run.
    pub max_text_run_segments: usize,
}

impl Default for DrawlistLimits {
    fn default() -> Self {
        Self {
            max_total_bytes: 4 << 20,
            max_cmds: 100_000,
            max_strings: 50_000,
            max_blobs: 10_000,
            max_blob_bytes: 4 << 20,
            max_clip_depth: 64,
            max_text_run_segments: 4096,
        }
    }
}

/// Cursor placement for [`DrawlistBuilder::set_cursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorState {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Shape.
    pub shape: CursorShape,
    /// Whether the cursor is shown.
    pub visible: bool,
    /// Whether the cursor blinks.
    pub blink: bool,
}

/// Image parameters for [`DrawlistBuilder::draw_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageParams {
    /// Payload encoding.
    pub format: ImageFormat,
    /// Source width in pixels.
    pub px_width: u32,
    /// Source height in pixels.
    pub px_height: u32,
    /// Stable id so protocols can keep the image resident.
    pub image_id: u32,
}

/// One styled segment of a text run.
#[derive(Debug, Clone, Copy)]
pub struct TextRunSegment<'a> {
    /// Segment text.
    pub text: &'a str,
    /// Segment style.
    pub style: &'a TextStyle,
}

/// Counters describing the current frame and the builder's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawlistStats {
    /// Commands in the current frame.
    pub cmds: u32,
    /// Strings in the current frame.
    pub strings: u32,
    /// Blobs in the current frame.
    pub blobs: u32,
    /// Size of the last successful build.
    pub last_build_bytes: usize,
    /// Keyed blobs served without re-encoding.
    pub blob_cache_hits: u64,
    /// Keyed blobs that had to be encoded.
    pub blob_cache_misses: u64,
    /// Style packing counters.
    pub style: StyleStats,
}

/// The drawing surface shared by every drawlist version.
pub trait DrawlistBuilder {
    /// Format version this builder emits.
    fn version(&self) -> DrawlistVersion;

    /// Clear the whole framebuffer.
    fn clear(&mut self);

    /// Clear, then fill `cols x rows` from the origin with `style`.
    fn clear_to(&mut self, cols: i32, rows: i32, style: &TextStyle);

    /// Fill a rectangle with spaces.
    fn fill_rect(&mut self, rect: Rect, style: &TextStyle);

    /// Draw text starting at a cell.
    fn draw_text(&mut self, x: i32, y: i32, text: &str, style: &TextStyle);

    /// Restrict subsequent drawing to `rect` (intersected with the current clip).
    fn push_clip(&mut self, rect: Rect);

    /// Undo the innermost [`push_clip`](Self::push_clip).
    fn pop_clip(&mut self);

    /// Copy an already drawn rectangle to a new origin.
    fn blit_rect(&mut self, src: Rect, dst_x: i32, dst_y: i32);

    /// Place and show the cursor.
    fn set_cursor(&mut self, cursor: CursorState);

    /// Hide the cursor.
    fn hide_cursor(&mut self);

    /// Start a hyperlink for subsequent text, or end it with `None`.
    fn set_link(&mut self, link: Option<&Link>);

    /// Draw an RGBA8 pixel blob into `rect`.
    fn draw_canvas(&mut self, rect: Rect, blob: u32, px_width: u32, px_height: u32, blitter: Blitter);

    /// Draw an image blob into `rect`.
    fn draw_image(&mut self, rect: Rect, blob: u32, params: ImageParams);

    /// Draw a text-run blob starting at a cell.
    fn draw_text_run(&mut self, x: i32, y: i32, blob: u32);

    /// Append a payload to the blob table.
    ///
    /// Returns `None` when a limit would be exceeded.
    fn add_blob(&mut self, bytes: &[u8]) -> Option<u32>;

    /// Append a payload identified by a stable `key`.
    ///
    /// `encode` only runs when no payload for `(key, stamp)` is cached from
    /// this or a previous frame.
    fn add_blob_keyed(
        &mut self,
        key: &str,
        stamp: u64,
        encode: &mut dyn FnMut(&mut Vec<u8>),
    ) -> Option<u32>;

    /// Encode styled segments as a text-run blob.
    fn add_text_run_blob(&mut self, segments: &[TextRunSegment<'_>]) -> Option<u32>;

    /// Serialize the frame.
    fn build(&mut self) -> Result<&[u8], DrawlistError>;

    /// Drop the frame's state, keeping allocations.
    fn reset(&mut self);
}

/// Interned strings backed by one [`TextArena`].
#[derive(Debug, Clone, Default)]
struct StringTable {
    arena: TextArena,
    spans: Vec<TextSlice>,
    /// Content hash to index. Collisions simply skip dedup.
    lookup: HashMap<u64, u32>,
}

impl StringTable {
    fn intern(&mut self, text: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();
        if let Some(&index) = self.lookup.get(&hash) {
            if self.arena.get(self.spans[index as usize]) == text.as_bytes() {
                return index;
            }
        }
        let index = self.spans.len() as u32;
        self.spans.push(self.arena.push_str(text));
        self.lookup.entry(hash).or_insert(index);
        index
    }

    fn len(&self) -> u32 {
        self.spans.len() as u32
    }

    fn reset(&mut self) {
        self.arena.reset();
        self.spans.clear();
        self.lookup.clear();
    }
}

#[derive(Debug, Clone)]
struct CachedBlob {
    stamp: u64,
    bytes: Vec<u8>,
    last_used: u64,
}

/// Versioned drawlist builder.
#[derive(Debug, Clone)]
pub struct Builder {
    version: DrawlistVersion,
    limits: DrawlistLimits,
    cmds: WireWriter,
    cmd_count: u32,
    strings: StringTable,
    blob_bytes: Vec<u8>,
    blob_spans: Vec<(u32, u32)>,
    /// `key -> (stamp, index)` for blobs added this frame.
    frame_blobs: HashMap<String, (u64, u32)>,
    blob_cache: HashMap<String, CachedBlob>,
    generation: u64,
    clips: Vec<Rect>,
    error: Option<DrawlistError>,
    packer: StylePacker,
    scratch: WireWriter,
    out: WireWriter,
    stats: DrawlistStats,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(DrawlistVersion::LATEST)
    }
}

impl Builder {
    /// Create a builder targeting `version` with default limits.
    pub fn new(version: DrawlistVersion) -> Self {
        Self::with_limits(version, DrawlistLimits::default())
    }

    /// Create a builder targeting `version` with explicit limits.
    pub fn with_limits(version: DrawlistVersion, limits: DrawlistLimits) -> Self {
        Self {
            version,
            limits,
            cmds: WireWriter::with_capacity(4096),
            cmd_count: 0,
            strings: StringTable::default(),
            blob_bytes: Vec::new(),
            blob_spans: Vec::new(),
            frame_blobs: HashMap::new(),
            blob_cache: HashMap::new(),
            generation: 0,
            clips: Vec::new(),
            error: None,
            packer: StylePacker::new(),
            scratch: WireWriter::default(),
            out: WireWriter::with_capacity(8192),
            stats: DrawlistStats::default(),
        }
    }

    /// Limits in effect.
    pub const fn limits(&self) -> &DrawlistLimits {
        &self.limits
    }

    /// Counters for the current frame and lifetime totals.
    pub fn stats(&self) -> DrawlistStats {
        DrawlistStats {
            cmds: self.cmd_count,
            strings: self.strings.len(),
            blobs: self.blob_spans.len() as u32,
            style: self.packer.stats(),
            ..self.stats
        }
    }

    /// The first error recorded this frame, if any.
    pub const fn error(&self) -> Option<&DrawlistError> {
        self.error.as_ref()
    }

    /// Bytes of the last successful build; empty after a reset.
    pub fn output(&self) -> &[u8] {
        self.out.as_bytes()
    }

    /// Current clip stack depth.
    pub fn clip_depth(&self) -> usize {
        self.clips.len()
    }

    /// Innermost clip rectangle, if any.
    pub fn current_clip(&self) -> Option<Rect> {
        self.clips.last().copied()
    }

    /// Drop cached keyed blobs and release frame buffers.
    pub fn release(&mut self) {
        self.reset();
        self.blob_cache.clear();
        self.strings.arena.release();
        self.blob_bytes = Vec::new();
        self.out = WireWriter::default();
    }

    fn fail(&mut self, code: DrawlistErrorCode, detail: impl Into<String>) {
        if self.error.is_none() {
            let err = DrawlistError::new(code, detail);
            tracing::debug!(error = %err, "drawlist error recorded");
            self.error = Some(err);
        }
    }

    /// Common guard for every command. Returns false when it must be skipped.
    fn admit(&mut self, op: Opcode) -> bool {
        if self.error.is_some() {
            return false;
        }
        if !self.version.supports(op) {
            self.fail(
                DrawlistErrorCode::BadParams,
                format!(
                    "{} requires drawlist v{}, builder targets v{}",
                    op.name(),
                    op.min_version().tag(),
                    self.version.tag()
                ),
            );
            return false;
        }
        if self.cmd_count >= self.limits.max_cmds {
            self.fail(
                DrawlistErrorCode::TooLarge,
                format!("more than {} commands", self.limits.max_cmds),
            );
            return false;
        }
        true
    }

    fn check_rect(&mut self, op: Opcode, rect: Rect) -> bool {
        if rect.w < 0 || rect.h < 0 {
            self.fail(
                DrawlistErrorCode::BadParams,
                format!("{}: negative size {rect:?}", op.name()),
            );
            return false;
        }
        true
    }

    fn check_blob(&mut self, op: Opcode, blob: u32) -> bool {
        if blob as usize >= self.blob_spans.len() {
            self.fail(
                DrawlistErrorCode::BadParams,
                format!("{}: unknown blob {blob}", op.name()),
            );
            return false;
        }
        true
    }

    fn check_string_limit(&mut self) {
        if self.strings.len() > self.limits.max_strings {
            self.fail(
                DrawlistErrorCode::TooLarge,
                format!("more than {} strings", self.limits.max_strings),
            );
        }
    }

    /// Write a command header; the size is patched by [`Self::end_cmd`].
    fn begin_cmd(&mut self, op: Opcode) -> usize {
        let start = self.cmds.len();
        self.cmds.write_u16(op as u16);
        self.cmds.write_u16(0);
        self.cmds.write_u32(0);
        start
    }

    fn end_cmd(&mut self, start: usize) {
        self.cmds.pad4();
        let size = (self.cmds.len() - start) as u32;
        self.cmds.patch_u32(start + 4, size);
        self.cmd_count += 1;
    }

    fn pack_style(&mut self, style: &TextStyle) -> EncodedStyle {
        let strings = &mut self.strings;
        let with_links = self.version >= DrawlistVersion::V2;
        let packed = if with_links {
            self.packer.pack(style, |s| strings.intern(s) + 1)
        } else {
            self.packer.pack(style, |_| 0)
        };
        self.check_string_limit();
        packed
    }

    fn write_rect(w: &mut WireWriter, rect: Rect) {
        w.write_i32(rect.x);
        w.write_i32(rect.y);
        w.write_i32(rect.w);
        w.write_i32(rect.h);
    }

    fn write_style(w: &mut WireWriter, style: &EncodedStyle, version: DrawlistVersion) {
        w.write_u32(style.fg);
        w.write_u32(style.bg);
        w.write_u32(style.attrs);
        if version >= DrawlistVersion::V2 {
            w.write_u32(style.underline_color);
            w.write_u32(style.link_uri_ref);
            w.write_u32(style.link_id_ref);
        }
        w.write_u32(style.reserved);
    }

    /// Append a finished payload to the blob table.
    fn push_blob(&mut self, bytes: &[u8]) -> Option<u32> {
        if self.error.is_some() {
            return None;
        }
        if self.blob_spans.len() as u32 >= self.limits.max_blobs {
            self.fail(
                DrawlistErrorCode::TooLarge,
                format!("more than {} blobs", self.limits.max_blobs),
            );
            return None;
        }
        let offset = self.blob_bytes.len();
        if offset + align4(bytes.len()) > self.limits.max_blob_bytes {
            self.fail(
                DrawlistErrorCode::TooLarge,
                format!("blob bytes exceed {}", self.limits.max_blob_bytes),
            );
            return None;
        }
        self.blob_bytes.extend_from_slice(bytes);
        self.blob_bytes.resize(align4(self.blob_bytes.len()), 0);
        let index = self.blob_spans.len() as u32;
        self.blob_spans.push((offset as u32, bytes.len() as u32));
        Some(index)
    }

    /// Serialize into `out`. Assumes no sticky error.
    fn assemble(&mut self) -> Result<(), DrawlistError> {
        if !self.clips.is_empty() {
            return Err(DrawlistError::new(
                DrawlistErrorCode::Format,
                format!("{} unbalanced push_clip", self.clips.len()),
            ));
        }
        let out = &mut self.out;
        out.clear();
        out.write_raw(&[0; HEADER_SIZE]);

        let cmd_offset = out.len();
        out.write_raw(self.cmds.as_bytes());
        let cmd_bytes = out.len() - cmd_offset;

        let strings_span_offset = out.len();
        for span in &self.strings.spans {
            out.write_u32(span.offset);
            out.write_u32(span.length);
        }
        let strings_bytes_offset = out.len();
        out.write_raw(self.strings.arena.as_bytes());
        let strings_bytes_len = self.strings.arena.len();
        out.pad4();

        let blobs_span_offset = out.len();
        for &(offset, length) in &self.blob_spans {
            out.write_u32(offset);
            out.write_u32(length);
        }
        let blobs_bytes_offset = out.len();
        out.write_raw(&self.blob_bytes);
        let blobs_bytes_len = self.blob_bytes.len();

        let total = out.len();
        if total > self.limits.max_total_bytes {
            return Err(DrawlistError::new(
                DrawlistErrorCode::TooLarge,
                format!("{total} bytes exceeds {}", self.limits.max_total_bytes),
            ));
        }
        let total = u32::try_from(total)
            .map_err(|_| DrawlistError::new(DrawlistErrorCode::TooLarge, "size overflows u32"))?;

        for (field, value) in [
            (header::MAGIC, MAGIC),
            (header::VERSION, self.version.tag()),
            (header::HEADER_SIZE, HEADER_SIZE as u32),
            (header::TOTAL_SIZE, total),
            (header::CMD_OFFSET, cmd_offset as u32),
            (header::CMD_BYTES, cmd_bytes as u32),
            (header::CMD_COUNT, self.cmd_count),
            (header::STRINGS_SPAN_OFFSET, strings_span_offset as u32),
            (header::STRINGS_COUNT, self.strings.len()),
            (header::STRINGS_BYTES_OFFSET, strings_bytes_offset as u32),
            (header::STRINGS_BYTES_LEN, strings_bytes_len as u32),
            (header::BLOBS_SPAN_OFFSET, blobs_span_offset as u32),
            (header::BLOBS_COUNT, self.blob_spans.len() as u32),
            (header::BLOBS_BYTES_OFFSET, blobs_bytes_offset as u32),
            (header::BLOBS_BYTES_LEN, blobs_bytes_len as u32),
            (header::RESERVED, 0),
        ] {
            out.patch_u32(field, value);
        }
        Ok(())
    }
}

impl DrawlistBuilder for Builder {
    fn version(&self) -> DrawlistVersion {
        self.version
    }

    fn clear(&mut self) {
        if !self.admit(Opcode::Clear) {
            return;
        }
        let start = self.begin_cmd(Opcode::Clear);
        self.end_cmd(start);
    }

    fn clear_to(&mut self, cols: i32, rows: i32, style: &TextStyle) {
        self.clear();
        self.fill_rect(Rect::new(0, 0, cols, rows), style);
    }

    fn fill_rect(&mut self, rect: Rect, style: &TextStyle) {
        if !self.admit(Opcode::FillRect) || !self.check_rect(Opcode::FillRect, rect) {
            return;
        }
        let packed = self.pack_style(style);
        let start = self.begin_cmd(Opcode::FillRect);
        Self::write_rect(&mut self.cmds, rect);
        Self::write_style(&mut self.cmds, &packed, self.version);
        self.end_cmd(start);
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, style: &TextStyle) {
        if !self.admit(Opcode::DrawText) {
            return;
        }
        let index = self.strings.intern(text);
        self.check_string_limit();
        let packed = self.pack_style(style);
        let start = self.begin_cmd(Opcode::DrawText);
        self.cmds.write_i32(x);
        self.cmds.write_i32(y);
        self.cmds.write_u32(index);
        self.cmds.write_u32(0);
        self.cmds.write_u32(text.len() as u32);
        Self::write_style(&mut self.cmds, &packed, self.version);
        self.end_cmd(start);
    }

    fn push_clip(&mut self, rect: Rect) {
        if !self.admit(Opcode::PushClip) || !self.check_rect(Opcode::PushClip, rect) {
            return;
        }
        if self.clips.len() >= self.limits.max_clip_depth {
            self.fail(
                DrawlistErrorCode::TooLarge,
                format!("clip depth exceeds {}", self.limits.max_clip_depth),
            );
            return;
        }
        let effective = self
            .clips
            .last()
            .map_or(rect, |outer| outer.intersection(&rect));
        self.clips.push(effective);
        let start = self.begin_cmd(Opcode::PushClip);
        Self::write_rect(&mut self.cmds, rect);
        self.end_cmd(start);
    }

    fn pop_clip(&mut self) {
        if !self.admit(Opcode::PopClip) {
            return;
        }
        if self.clips.pop().is_none() {
            self.fail(DrawlistErrorCode::Format, "pop_clip without matching push_clip");
            return;
        }
        let start = self.begin_cmd(Opcode::PopClip);
        self.end_cmd(start);
    }

    fn blit_rect(&mut self, src: Rect, dst_x: i32, dst_y: i32) {
        if !self.admit(Opcode::BlitRect) || !self.check_rect(Opcode::BlitRect, src) {
            return;
        }
        let start = self.begin_cmd(Opcode::BlitRect);
        Self::write_rect(&mut self.cmds, src);
        self.cmds.write_i32(dst_x);
        self.cmds.write_i32(dst_y);
        self.end_cmd(start);
    }

    fn set_cursor(&mut self, cursor: CursorState) {
        if !self.admit(Opcode::SetCursor) {
            return;
        }
        let start = self.begin_cmd(Opcode::SetCursor);
        self.cmds.write_i32(cursor.x);
        self.cmds.write_i32(cursor.y);
        self.cmds.write_u8(cursor.shape as u8);
        self.cmds.write_u8(u8::from(cursor.visible));
        self.cmds.write_u8(u8::from(cursor.blink));
        self.cmds.write_u8(0);
        self.end_cmd(start);
    }

    fn hide_cursor(&mut self) {
        self.set_cursor(CursorState {
            x: -1,
            y: -1,
            visible: false,
            ..CursorState::default()
        });
    }

    fn set_link(&mut self, link: Option<&Link>) {
        if !self.admit(Opcode::SetLink) {
            return;
        }
        let (uri, id) = link.map_or((0, 0), |link| {
            let uri = self.strings.intern(&link.uri) + 1;
            let id = link.id.as_deref().map_or(0, |id| self.strings.intern(id) + 1);
            (uri, id)
        });
        self.check_string_limit();
        let start = self.begin_cmd(Opcode::SetLink);
        self.cmds.write_u32(uri);
        self.cmds.write_u32(id);
        self.end_cmd(start);
    }

    fn draw_canvas(&mut self, rect: Rect, blob: u32, px_width: u32, px_height: u32, blitter: Blitter) {
        if !self.admit(Opcode::DrawCanvas)
            || !self.check_rect(Opcode::DrawCanvas, rect)
            || !self.check_blob(Opcode::DrawCanvas, blob)
        {
            return;
        }
        let expected = u64::from(px_width) * u64::from(px_height) * 4;
        let actual = u64::from(self.blob_spans[blob as usize].1);
        if expected != actual {
            self.fail(
                DrawlistErrorCode::BadParams,
                format!("draw_canvas: blob {blob} has {actual} bytes, expected {expected}"),
            );
            return;
        }
        let start = self.begin_cmd(Opcode::DrawCanvas);
        Self::write_rect(&mut self.cmds, rect);
        self.cmds.write_u32(blob);
        self.cmds.write_u32(px_width);
        self.cmds.write_u32(px_height);
        self.cmds.write_u8(blitter as u8);
        self.end_cmd(start);
    }

    fn draw_image(&mut self, rect: Rect, blob: u32, params: ImageParams) {
        if !self.admit(Opcode::DrawImage)
            || !self.check_rect(Opcode::DrawImage, rect)
            || !self.check_blob(Opcode::DrawImage, blob)
        {
            return;
        }
        let start = self.begin_cmd(Opcode::DrawImage);
        Self::write_rect(&mut self.cmds, rect);
        self.cmds.write_u32(blob);
        self.cmds.write_u32(params.px_width);
        self.cmds.write_u32(params.px_height);
        self.cmds.write_u32(params.image_id);
        self.cmds.write_u8(params.format as u8);
        self.end_cmd(start);
    }

    fn draw_text_run(&mut self, x: i32, y: i32, blob: u32) {
        if !self.admit(Opcode::DrawTextRun) || !self.check_blob(Opcode::DrawTextRun, blob) {
            return;
        }
        let start = self.begin_cmd(Opcode::DrawTextRun);
        self.cmds.write_i32(x);
        self.cmds.write_i32(y);
        self.cmds.write_u32(blob);
        self.cmds.write_u32(0);
        self.end_cmd(start);
    }

    fn add_blob(&mut self, bytes: &[u8]) -> Option<u32> {
        self.push_blob(bytes)
    }

    fn add_blob_keyed(
        &mut self,
        key: &str,
        stamp: u64,
        encode: &mut dyn FnMut(&mut Vec<u8>),
    ) -> Option<u32> {
        if let Some(&(frame_stamp, index)) = self.frame_blobs.get(key) {
            if frame_stamp == stamp {
                return Some(index);
            }
        }
        let generation = self.generation;
        let mut cached = match self.blob_cache.remove(key) {
            Some(entry) if entry.stamp == stamp => {
                self.stats.blob_cache_hits += 1;
                entry
            }
            stale => {
                self.stats.blob_cache_misses += 1;
                tracing::trace!(key, stamp, "blob cache miss");
                let mut bytes = stale.map(|entry| entry.bytes).unwrap_or_default();
                bytes.clear();
                encode(&mut bytes);
                CachedBlob {
                    stamp,
                    bytes,
                    last_used: generation,
                }
            }
        };
        cached.last_used = generation;
        let index = self.push_blob(&cached.bytes);
        self.blob_cache.insert(key.to_owned(), cached);
        if let Some(index) = index {
            self.frame_blobs.insert(key.to_owned(), (stamp, index));
        }
        index
    }

    fn add_text_run_blob(&mut self, segments: &[TextRunSegment<'_>]) -> Option<u32> {
        if self.error.is_some() {
            return None;
        }
        if segments.len() > self.limits.max_text_run_segments {
            self.fail(
                DrawlistErrorCode::TooLarge,
                format!(
                    "text run has {} segments, limit {}",
                    segments.len(),
                    self.limits.max_text_run_segments
                ),
            );
            return None;
        }
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.write_u32(segments.len() as u32);
        for segment in segments {
            let packed = self.pack_style(segment.style);
            let index = self.strings.intern(segment.text);
            Self::write_style(&mut scratch, &packed, self.version);
            scratch.write_u32(index);
            scratch.write_u32(0);
            scratch.write_u32(segment.text.len() as u32);
        }
        self.check_string_limit();
        let blob = self.push_blob(scratch.as_bytes());
        self.scratch = scratch;
        blob
    }

    fn build(&mut self) -> Result<&[u8], DrawlistError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.assemble()?;
        self.stats.last_build_bytes = self.out.len();
        tracing::debug!(
            version = self.version.tag(),
            bytes = self.out.len(),
            cmds = self.cmd_count,
            strings = self.strings.len(),
            blobs = self.blob_spans.len(),
            "drawlist built"
        );
        Ok(self.out.as_bytes())
    }

    fn reset(&mut self) {
        self.cmds.clear();
        self.cmd_count = 0;
        self.strings.reset();
        self.blob_bytes.clear();
        self.blob_spans.clear();
        self.frame_blobs.clear();
        let generation = self.generation;
        self.blob_cache.retain(|_, entry| entry.last_used == generation);
        self.generation += 1;
        self.clips.clear();
        self.error = None;
        self.packer.clear();
        self.out.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawlist::format::CMD_HEADER_SIZE;
    use crate::drawlist::parse::{parse, Command};

    #[test]
    fn test_build_after_clear() {
        let mut b = Builder::default();
        b.clear();
        let bytes = b.build().unwrap();
        assert!(bytes.len() >= HEADER_SIZE + CMD_HEADER_SIZE);
        let parsed = parse(bytes).unwrap();
        assert_eq!(parsed.commands, vec![Command::Clear]);
    }

    #[test]
    fn test_reset_then_build_is_independent() {
        let mut b = Builder::default();
        b.clear();
        b.draw_text(0, 0, "first frame", &TextStyle::default());
        let first = b.build().unwrap().to_vec();

        b.reset();
        b.clear_to(10, 2, &TextStyle::default());
        let second = b.build().unwrap().to_vec();
        assert!(!second.is_empty());
        assert_ne!(first, second);

        let parsed = parse(&second).unwrap();
        assert!(parsed.strings.is_empty(), "no residue from the prior frame");
        assert_eq!(parsed.commands.len(), 2);
        assert!(matches!(
            parsed.commands[1],
            Command::FillRect { rect, .. } if rect == Rect::new(0, 0, 10, 2)
        ));
    }

    #[test]
    fn test_unbalanced_clip_is_format_error() {
        let mut b = Builder::default();
        b.push_clip(Rect::new(0, 0, 5, 5));
        let err = b.build().unwrap_err();
        assert_eq!(err.code, DrawlistErrorCode::Format);

        b.reset();
        b.pop_clip();
        assert_eq!(b.build().unwrap_err().code, DrawlistErrorCode::Format);
    }

    #[test]
    fn test_balanced_clips_build() {
        let mut b = Builder::default();
        b.push_clip(Rect::new(0, 0, 10, 10));
        b.push_clip(Rect::new(5, 5, 10, 10));
        assert_eq!(b.current_clip(), Some(Rect::new(5, 5, 5, 5)));
        b.pop_clip();
        b.pop_clip();
        assert!(b.build().is_ok());
    }

    #[test]
    fn test_clip_depth_limit() {
        let limits = DrawlistLimits {
            max_clip_depth: 1,
            ..DrawlistLimits::default()
        };
        let mut b = Builder::with_limits(DrawlistVersion::V3, limits);
        b.push_clip(Rect::new(0, 0, 1, 1));
        b.push_clip(Rect::new(0, 0, 1, 1));
        assert_eq!(b.build().unwrap_err().code, DrawlistErrorCode::TooLarge);
    }

    #[test]
    fn test_strings_are_interned_once() {
        let mut b = Builder::default();
        b.draw_text(0, 0, "same", &TextStyle::default());
        b.draw_text(0, 1, "same", &TextStyle::default());
        b.draw_text(0, 2, "other", &TextStyle::default());
        let parsed = parse(b.build().unwrap()).unwrap();
        assert_eq!(parsed.strings, vec!["same".to_owned(), "other".to_owned()]);
    }

    #[test]
    fn test_blob_capacity_returns_none() {
        let limits = DrawlistLimits {
            max_blobs: 1,
            ..DrawlistLimits::default()
        };
        let mut b = Builder::with_limits(DrawlistVersion::V3, limits);
        assert_eq!(b.add_blob(&[1, 2, 3]), Some(0));
        assert_eq!(b.add_blob(&[4]), None);
        assert_eq!(b.build().unwrap_err().code, DrawlistErrorCode::TooLarge);
    }

    #[test]
    fn test_keyed_blob_skips_reencode_across_frames() {
        let mut b = Builder::default();
        let mut encodes = 0;
        for _ in 0..3 {
            let index = b.add_blob_keyed("canvas", 7, &mut |out| {
                encodes += 1;
                out.extend_from_slice(&[0; 16]);
            });
            assert_eq!(index, Some(0));
            b.clear();
            assert!(b.build().is_ok());
            b.reset();
        }
        assert_eq!(encodes, 1);
        assert_eq!(b.stats().blob_cache_hits, 2);

        b.add_blob_keyed("canvas", 8, &mut |out| {
            encodes += 1;
            out.push(1);
        });
        assert_eq!(encodes, 2);
    }

    #[test]
    fn test_keyed_blob_dedups_within_frame() {
        let mut b = Builder::default();
        let a = b.add_blob_keyed("k", 1, &mut |out| out.push(1));
        let c = b.add_blob_keyed("k", 1, &mut |out| out.push(1));
        assert_eq!(a, c);
        assert_eq!(b.stats().blobs, 1);
    }

    #[test]
    fn test_unsupported_op_for_version() {
        let mut b = Builder::new(DrawlistVersion::V1);
        b.set_link(None);
        let err = b.build().unwrap_err();
        assert_eq!(err.code, DrawlistErrorCode::BadParams);
        assert!(err.detail.contains("set_link"));
    }

    #[test]
    fn test_v1_style_is_compact() {
        let mut v1 = Builder::new(DrawlistVersion::V1);
        let mut v3 = Builder::new(DrawlistVersion::V3);
        v1.fill_rect(Rect::new(0, 0, 1, 1), &TextStyle::default());
        v3.fill_rect(Rect::new(0, 0, 1, 1), &TextStyle::default());
        let d = v3.build().unwrap().len() - v1.build().unwrap().len();
        assert_eq!(d, 12);
    }

    #[test]
    fn test_negative_rect_is_bad_params() {
        let mut b = Builder::default();
        b.fill_rect(Rect::new(0, 0, -1, 1), &TextStyle::default());
        assert_eq!(b.build().unwrap_err().code, DrawlistErrorCode::BadParams);
    }

    #[test]
    fn test_canvas_size_mismatch() {
        let mut b = Builder::default();
        let blob = b.add_blob(&[0; 8]).unwrap();
        b.draw_canvas(Rect::new(0, 0, 1, 1), blob, 2, 2, Blitter::Auto);
        assert_eq!(b.build().unwrap_err().code, DrawlistErrorCode::BadParams);
    }

    #[test]
    fn test_command_limit() {
        let limits = DrawlistLimits {
            max_cmds: 2,
            ..DrawlistLimits::default()
        };
        let mut b = Builder::with_limits(DrawlistVersion::V3, limits);
        b.clear();
        b.clear();
        b.clear();
        assert_eq!(b.build().unwrap_err().code, DrawlistErrorCode::TooLarge);
    }

    #[test]
    fn test_style_reuse_counted() {
        let mut b = Builder::default();
        let style = TextStyle::bold();
        for y in 0..4 {
            b.draw_text(0, y, "x", &style);
        }
        let stats = b.stats();
        assert_eq!(stats.style.packs, 1);
        assert_eq!(stats.style.reuses, 3);
    }
}
