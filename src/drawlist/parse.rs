//! Drawlist decoder.
//!
//! Validates a serialized drawlist and decodes it back into commands. The
//! engine side of the boundary does the same work; having it here keeps the
//! encoder honest in tests and lets tools inspect captured frames.

use super::builder::{CursorState, ImageParams};
use super::format::{
    header, read_u16, read_u32, Blitter, CursorShape, DrawlistVersion, ImageFormat, Opcode,
    CMD_HEADER_SIZE, HEADER_SIZE, MAGIC, SPAN_SIZE,
};
use super::style::EncodedStyle;
use crate::error::{DrawlistError, DrawlistErrorCode};
use crate::layout::Rect;

/// One decoded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Clear the framebuffer.
    Clear,
    /// Fill a rectangle.
    FillRect {
        /// Target.
        rect: Rect,
        /// Fill style.
        style: EncodedStyle,
    },
    /// Draw a string-table slice.
    DrawText {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// String index.
        string: u32,
        /// Byte offset inside the string.
        byte_offset: u32,
        /// Byte length.
        byte_len: u32,
        /// Text style.
        style: EncodedStyle,
    },
    /// Push a clip rectangle.
    PushClip {
        /// Clip.
        rect: Rect,
    },
    /// Pop a clip rectangle.
    PopClip,
    /// Draw a text-run blob.
    DrawTextRun {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Blob index.
        blob: u32,
    },
    /// Set the cursor.
    SetCursor(CursorState),
    /// Copy cells.
    BlitRect {
        /// Source rectangle.
        src: Rect,
        /// Destination column.
        dst_x: i32,
        /// Destination row.
        dst_y: i32,
    },
    /// Begin (`uri_ref != 0`) or end a hyperlink.
    SetLink {
        /// 1-based string reference of the URI.
        uri_ref: u32,
        /// 1-based string reference of the id, `0` for none.
        id_ref: u32,
    },
    /// Draw a pixel canvas.
    DrawCanvas {
        /// Target cells.
        rect: Rect,
        /// Blob index.
        blob: u32,
        /// Source width in pixels.
        px_width: u32,
        /// Source height in pixels.
        px_height: u32,
        /// Blitter.
        blitter: Blitter,
    },
    /// Draw an image.
    DrawImage {
        /// Target cells.
        rect: Rect,
        /// Blob index.
        blob: u32,
        /// Image parameters.
        params: ImageParams,
    },
}

/// One segment of a decoded text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSegment {
    /// Segment style.
    pub style: EncodedStyle,
    /// String index.
    pub string: u32,
    /// Byte offset inside the string.
    pub byte_offset: u32,
    /// Byte length.
    pub byte_len: u32,
}

/// A fully decoded drawlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDrawlist {
    /// Format version from the header.
    pub version: DrawlistVersion,
    /// Commands in submission order.
    pub commands: Vec<Command>,
    /// String table.
    pub strings: Vec<String>,
    /// Blob table.
    pub blobs: Vec<Vec<u8>>,
}

impl ParsedDrawlist {
    /// Resolve a string-table slice.
    pub fn text(&self, string: u32, byte_offset: u32, byte_len: u32) -> Option<&str> {
        let s = self.strings.get(string as usize)?;
        let start = byte_offset as usize;
        s.get(start..start.checked_add(byte_len as usize)?)
    }

    /// Resolve a 1-based string reference (`0` is none).
    pub fn string_ref(&self, reference: u32) -> Option<&str> {
        let index = reference.checked_sub(1)?;
        self.strings.get(index as usize).map(String::as_str)
    }

    /// Decode a text-run blob.
    pub fn text_run(&self, blob: u32) -> Result<Vec<RunSegment>, DrawlistError> {
        let bytes = self
            .blobs
            .get(blob as usize)
            .ok_or_else(|| format_error(format!("unknown blob {blob}")))?;
        decode_text_run(bytes, self.version)
    }

    /// Concatenated text of every `DrawText` and text-run segment.
    ///
    /// Handy for asserting what a frame shows.
    pub fn visible_text(&self) -> Vec<String> {
        let mut out = Vec::new();
        for command in &self.commands {
            match *command {
                Command::DrawText {
                    string,
                    byte_offset,
                    byte_len,
                    ..
                } => {
                    if let Some(text) = self.text(string, byte_offset, byte_len) {
                        out.push(text.to_owned());
                    }
                }
                Command::DrawTextRun { blob, .. } => {
                    if let Ok(segments) = self.text_run(blob) {
                        let joined: String = segments
                            .iter()
                            .filter_map(|s| self.text(s.string, s.byte_offset, s.byte_len))
                            .collect();
                        out.push(joined);
                    }
                }
                _ => {}
            }
        }
        out
    }
}

fn format_error(detail: impl Into<String>) -> DrawlistError {
    DrawlistError::new(DrawlistErrorCode::Format, detail)
}

/// Bounds-checked little-endian reader over one region.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u32(&mut self) -> Result<u32, DrawlistError> {
        let value = read_u32(self.bytes, self.pos)
            .ok_or_else(|| format_error(format!("truncated at byte {}", self.pos)))?;
        self.pos += 4;
        Ok(value)
    }

    fn i32(&mut self) -> Result<i32, DrawlistError> {
        self.u32().map(|v| v as i32)
    }

    fn u8(&mut self) -> Result<u8, DrawlistError> {
        let value = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| format_error(format!("truncated at byte {}", self.pos)))?;
        self.pos += 1;
        Ok(value)
    }

    fn rect(&mut self) -> Result<Rect, DrawlistError> {
        Ok(Rect::new(self.i32()?, self.i32()?, self.i32()?, self.i32()?))
    }

    fn style(&mut self, version: DrawlistVersion) -> Result<EncodedStyle, DrawlistError> {
        let fg = self.u32()?;
        let bg = self.u32()?;
        let attrs = self.u32()?;
        let (underline_color, link_uri_ref, link_id_ref) = if version >= DrawlistVersion::V2 {
            (self.u32()?, self.u32()?, self.u32()?)
        } else {
            (0, 0, 0)
        };
        let reserved = self.u32()?;
        Ok(EncodedStyle {
            fg,
            bg,
            attrs,
            underline_color,
            link_uri_ref,
            link_id_ref,
            reserved,
        })
    }
}

/// A `(offset, count, item size)` section must lie inside the buffer.
fn section<'a>(
    bytes: &'a [u8],
    offset: u32,
    len: usize,
    what: &str,
) -> Result<&'a [u8], DrawlistError> {
    let start = offset as usize;
    start
        .checked_add(len)
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| format_error(format!("{what} section out of bounds")))
}

fn spans(
    bytes: &[u8],
    span_offset: u32,
    count: u32,
    data: &[u8],
    what: &str,
) -> Result<Vec<(usize, usize)>, DrawlistError> {
    let table = section(bytes, span_offset, count as usize * SPAN_SIZE, what)?;
    let mut reader = Reader::new(table);
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let offset = reader.u32()? as usize;
        let length = reader.u32()? as usize;
        if offset.checked_add(length).map_or(true, |end| end > data.len()) {
            return Err(format_error(format!("{what} {i} out of bounds")));
        }
        out.push((offset, length));
    }
    Ok(out)
}

fn header_field(bytes: &[u8], field: usize) -> Result<u32, DrawlistError> {
    read_u32(bytes, field).ok_or_else(|| format_error("truncated header"))
}

/// Validate and decode a drawlist.
pub fn parse(bytes: &[u8]) -> Result<ParsedDrawlist, DrawlistError> {
    if bytes.len() < HEADER_SIZE {
        return Err(format_error(format!("{} bytes is smaller than the header", bytes.len())));
    }
    if header_field(bytes, header::MAGIC)? != MAGIC {
        return Err(format_error("bad magic"));
    }
    let tag = header_field(bytes, header::VERSION)?;
    let version = DrawlistVersion::from_tag(tag)
        .ok_or_else(|| format_error(format!("unknown version {tag}")))?;
    if header_field(bytes, header::HEADER_SIZE)? as usize != HEADER_SIZE {
        return Err(format_error("unexpected header size"));
    }
    if header_field(bytes, header::TOTAL_SIZE)? as usize != bytes.len() {
        return Err(format_error("total size does not match buffer"));
    }

    let string_data = section(
        bytes,
        header_field(bytes, header::STRINGS_BYTES_OFFSET)?,
        header_field(bytes, header::STRINGS_BYTES_LEN)? as usize,
        "string bytes",
    )?;
    let string_spans = spans(
        bytes,
        header_field(bytes, header::STRINGS_SPAN_OFFSET)?,
        header_field(bytes, header::STRINGS_COUNT)?,
        string_data,
        "string",
    )?;
    let strings = string_spans
        .into_iter()
        .enumerate()
        .map(|(i, (offset, length))| {
            std::str::from_utf8(&string_data[offset..offset + length])
                .map(str::to_owned)
                .map_err(|_| format_error(format!("string {i} is not UTF-8")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let blob_data = section(
        bytes,
        header_field(bytes, header::BLOBS_BYTES_OFFSET)?,
        header_field(bytes, header::BLOBS_BYTES_LEN)? as usize,
        "blob bytes",
    )?;
    let blobs = spans(
        bytes,
        header_field(bytes, header::BLOBS_SPAN_OFFSET)?,
        header_field(bytes, header::BLOBS_COUNT)?,
        blob_data,
        "blob",
    )?
    .into_iter()
    .map(|(offset, length)| blob_data[offset..offset + length].to_vec())
    .collect::<Vec<_>>();

    let cmds = section(
        bytes,
        header_field(bytes, header::CMD_OFFSET)?,
        header_field(bytes, header::CMD_BYTES)? as usize,
        "command",
    )?;
    let cmd_count = header_field(bytes, header::CMD_COUNT)?;
    let commands = parse_commands(cmds, cmd_count, version, strings.len(), blobs.len())?;

    Ok(ParsedDrawlist {
        version,
        commands,
        strings,
        blobs,
    })
}

fn parse_commands(
    cmds: &[u8],
    count: u32,
    version: DrawlistVersion,
    string_count: usize,
    blob_count: usize,
) -> Result<Vec<Command>, DrawlistError> {
    if count as usize > cmds.len() / CMD_HEADER_SIZE {
        return Err(format_error(format!(
            "header declares {count} commands in {} bytes",
            cmds.len()
        )));
    }
    let mut commands = Vec::with_capacity(count as usize);
    let mut pos = 0;
    while pos < cmds.len() {
        let raw_op = read_u16(cmds, pos).ok_or_else(|| format_error("truncated command"))?;
        let size = read_u32(cmds, pos + 4).ok_or_else(|| format_error("truncated command"))?
            as usize;
        if size < CMD_HEADER_SIZE || size % 4 != 0 || pos + size > cmds.len() {
            return Err(format_error(format!("bad command size {size} at {pos}")));
        }
        let op = Opcode::from_u16(raw_op)
            .ok_or_else(|| format_error(format!("unknown opcode {raw_op}")))?;
        if !version.supports(op) {
            return Err(format_error(format!("{} not valid in v{}", op.name(), version.tag())));
        }
        let mut r = Reader::new(&cmds[pos + CMD_HEADER_SIZE..pos + size]);
        let check_blob = |blob: u32| {
            if (blob as usize) < blob_count {
                Ok(blob)
            } else {
                Err(format_error(format!("{}: unknown blob {blob}", op.name())))
            }
        };
        let command = match op {
            Opcode::Clear => Command::Clear,
            Opcode::PopClip => Command::PopClip,
            Opcode::FillRect => Command::FillRect {
                rect: r.rect()?,
                style: r.style(version)?,
            },
            Opcode::DrawText => {
                let x = r.i32()?;
                let y = r.i32()?;
                let string = r.u32()?;
                if string as usize >= string_count {
                    return Err(format_error(format!("draw_text: unknown string {string}")));
                }
                Command::DrawText {
                    x,
                    y,
                    string,
                    byte_offset: r.u32()?,
                    byte_len: r.u32()?,
                    style: r.style(version)?,
                }
            }
            Opcode::PushClip => Command::PushClip { rect: r.rect()? },
            Opcode::DrawTextRun => {
                let x = r.i32()?;
                let y = r.i32()?;
                Command::DrawTextRun {
                    x,
                    y,
                    blob: check_blob(r.u32()?)?,
                }
            }
            Opcode::SetCursor => {
                let x = r.i32()?;
                let y = r.i32()?;
                let shape = r.u8()?;
                Command::SetCursor(CursorState {
                    x,
                    y,
                    shape: CursorShape::from_u8(shape)
                        .ok_or_else(|| format_error(format!("bad cursor shape {shape}")))?,
                    visible: r.u8()? != 0,
                    blink: r.u8()? != 0,
                })
            }
            Opcode::BlitRect => Command::BlitRect {
                src: r.rect()?,
                dst_x: r.i32()?,
                dst_y: r.i32()?,
            },
            Opcode::SetLink => Command::SetLink {
                uri_ref: r.u32()?,
                id_ref: r.u32()?,
            },
            Opcode::DrawCanvas => {
                let rect = r.rect()?;
                let blob = check_blob(r.u32()?)?;
                let px_width = r.u32()?;
                let px_height = r.u32()?;
                let raw = r.u8()?;
                Command::DrawCanvas {
                    rect,
                    blob,
                    px_width,
                    px_height,
                    blitter: Blitter::from_u8(raw)
                        .ok_or_else(|| format_error(format!("bad blitter {raw}")))?,
                }
            }
            Opcode::DrawImage => {
                let rect = r.rect()?;
                let blob = check_blob(r.u32()?)?;
                let px_width = r.u32()?;
                let px_height = r.u32()?;
                let image_id = r.u32()?;
                let raw = r.u8()?;
                Command::DrawImage {
                    rect,
                    blob,
                    params: ImageParams {
                        format: ImageFormat::from_u8(raw)
                            .ok_or_else(|| format_error(format!("bad image format {raw}")))?,
                        px_width,
                        px_height,
                        image_id,
                    },
                }
            }
        };
        commands.push(command);
        pos += size;
    }
    if commands.len() != count as usize {
        return Err(format_error(format!(
            "header declares {count} commands, found {}",
            commands.len()
        )));
    }
    Ok(commands)
}

/// Decode a text-run blob.
pub fn decode_text_run(
    bytes: &[u8],
    version: DrawlistVersion,
) -> Result<Vec<RunSegment>, DrawlistError> {
    let mut r = Reader::new(bytes);
    let count = r.u32()? as usize;
    let per_segment = version.style_size() + 12;
    if count.saturating_mul(per_segment) > bytes.len() - 4 {
        return Err(format_error(format!("text run claims {count} segments")));
    }
    let mut segments = Vec::with_capacity(count);
    for _ in 0..count {
        segments.push(RunSegment {
            style: r.style(version)?,
            string: r.u32()?,
            byte_offset: r.u32()?,
            byte_len: r.u32()?,
        });
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawlist::builder::{Builder, DrawlistBuilder, TextRunSegment};
    use crate::drawlist::style::{Link, TextStyle};

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse(&[0; 8]).unwrap_err().code, DrawlistErrorCode::Format);
        assert_eq!(parse(&[0; 64]).unwrap_err().code, DrawlistErrorCode::Format);
    }

    #[test]
    fn test_rejects_truncation() {
        let mut b = Builder::default();
        b.draw_text(1, 2, "hi", &TextStyle::default());
        let bytes = b.build().unwrap().to_vec();
        assert!(parse(&bytes[..bytes.len() - 4]).is_err());
    }

    #[test]
    fn test_rejects_oversized_command_count() {
        let mut b = Builder::default();
        b.clear();
        let mut bytes = b.build().unwrap().to_vec();
        let at = header::CMD_COUNT;
        bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err.code, DrawlistErrorCode::Format);
    }

    #[test]
    fn test_decodes_text_and_style() {
        let mut b = Builder::default();
        b.draw_text(3, 4, "hello", &TextStyle::bold());
        let parsed = parse(b.build().unwrap()).unwrap();
        match parsed.commands[0] {
            Command::DrawText { x, y, style, .. } => {
                assert_eq!((x, y), (3, 4));
                assert!(style.flags().contains(crate::drawlist::style::Attrs::BOLD));
            }
            ref other => panic!("unexpected {other:?}"),
        }
        assert_eq!(parsed.visible_text(), vec!["hello".to_owned()]);
    }

    #[test]
    fn test_decodes_text_run() {
        let mut b = Builder::default();
        let plain = TextStyle::default();
        let bold = TextStyle::bold();
        let blob = b
            .add_text_run_blob(&[
                TextRunSegment { text: "ab", style: &plain },
                TextRunSegment { text: "cd", style: &bold },
            ])
            .unwrap();
        b.draw_text_run(0, 0, blob);
        let parsed = parse(b.build().unwrap()).unwrap();
        let segments = parsed.text_run(blob).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(parsed.visible_text(), vec!["abcd".to_owned()]);
    }

    #[test]
    fn test_link_refs_resolve() {
        let mut b = Builder::default();
        let link = Link {
            uri: "https://example.com".into(),
            id: None,
        };
        b.set_link(Some(&link));
        b.draw_text(0, 0, "site", &TextStyle::default());
        b.set_link(None);
        let parsed = parse(b.build().unwrap()).unwrap();
        match parsed.commands[0] {
            Command::SetLink { uri_ref, id_ref } => {
                assert_eq!(parsed.string_ref(uri_ref), Some("https://example.com"));
                assert_eq!(id_ref, 0);
            }
            ref other => panic!("unexpected {other:?}"),
        }
        assert_eq!(parsed.commands[2], Command::SetLink { uri_ref: 0, id_ref: 0 });
    }

    #[test]
    fn test_v1_header_version() {
        let mut b = Builder::new(DrawlistVersion::V1);
        b.clear();
        let parsed = parse(b.build().unwrap()).unwrap();
        assert_eq!(parsed.version, DrawlistVersion::V1);
    }
}
