//! Text Arena: One contiguous, growable byte buffer per frame.
//!
//! Every text payload a frame draws is encoded into the arena once and
//! referenced afterwards by a [`TextSlice`]. The backing storage survives
//! [`TextArena::reset`], so steady-state frames do not allocate.
//!
//! ```text
//! ┌────────────── capacity ──────────────────┐
//! │ "hello" │ "wörld" │ "…"  │   free         │
//! └─────────┴─────────┴──────┴────────────────┘
//!  ^slice0   ^slice1   ^slice2  ^len
//! ```

/// Smallest capacity the arena grows to.
const MIN_CAPACITY: usize = 256;

/// A span of bytes inside the arena.
///
/// Only valid until the arena is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextSlice {
    /// Byte offset into the arena.
    pub offset: u32,
    /// Length in bytes.
    pub length: u32,
}

impl TextSlice {
    /// The empty slice.
    pub const EMPTY: Self = Self { offset: 0, length: 0 };

    /// Check if the slice covers no bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Growable contiguous UTF-8 buffer for one frame's text.
#[derive(Debug, Clone, Default)]
pub struct TextArena {
    /// Backing storage. `data.len()` is the capacity; bytes past `len` are scratch.
    data: Vec<u8>,
    /// Bytes in use.
    len: usize,
    /// Number of times the backing storage had to grow.
    grow_count: u64,
}

impl TextArena {
    /// Create an empty arena.
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            len: 0,
            grow_count: 0,
        }
    }

    /// Create an arena with an initial capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            len: 0,
            grow_count: 0,
        }
    }

    /// Bytes in use.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if the arena holds no text.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current backing capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// How many times the arena had to grow since creation.
    #[inline]
    pub const fn grow_count(&self) -> u64 {
        self.grow_count
    }

    /// All bytes written since the last reset.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Bytes for a slice previously returned by this arena.
    ///
    /// Returns an empty slice for spans that are out of range.
    pub fn get(&self, slice: TextSlice) -> &[u8] {
        let start = slice.offset as usize;
        let end = start.saturating_add(slice.length as usize);
        if end > self.len {
            return &[];
        }
        &self.data[start..end]
    }

    /// Forget all text, keeping the backing storage.
    #[inline]
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Release the backing storage entirely.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.len = 0;
    }

    /// Append a string and return its slice.
    pub fn push_str(&mut self, text: &str) -> TextSlice {
        let bytes = text.as_bytes();
        let offset = self.len;
        self.ensure_free(bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Self::slice(offset, bytes.len())
    }

    /// Append UTF-16 code units, transcoding to UTF-8.
    ///
    /// Lone surrogates are replaced with U+FFFD. Encoding proceeds into the
    /// free tail of the arena; whenever a step cannot make progress because
    /// the next code point does not fit, the arena grows and the step is
    /// retried.
    pub fn push_utf16(&mut self, units: &[u16]) -> TextSlice {
        let offset = self.len;
        let mut read = 0;
        // Optimistic first guess: one byte per unit.
        self.ensure_free(units.len());
        while read < units.len() {
            let (consumed, written) = encode_utf16_into(&units[read..], &mut self.data[self.len..]);
            read += consumed;
            self.len += written;
            if consumed == 0 {
                // Destination exhausted mid code point.
                self.ensure_free(4);
            }
        }
        Self::slice(offset, self.len - offset)
    }

    /// Free bytes left before the arena must grow.
    #[inline]
    fn free(&self) -> usize {
        self.data.len() - self.len
    }

    /// Grow (doubling) until at least `needed` free bytes exist.
    fn ensure_free(&mut self, needed: usize) {
        if self.free() >= needed {
            return;
        }
        let required = self.len + needed;
        let mut capacity = self.data.len().max(MIN_CAPACITY);
        while capacity < required {
            capacity = capacity.saturating_mul(2);
        }
        self.data.resize(capacity, 0);
        self.grow_count += 1;
        tracing::trace!(capacity, "text arena grew");
    }

    #[inline]
    const fn slice(offset: usize, length: usize) -> TextSlice {
        TextSlice {
            offset: offset as u32,
            length: length as u32,
        }
    }
}

/// Transcode as many whole code points as fit into `dst`.
///
/// Returns `(units_consumed, bytes_written)`. Returns `(0, 0)` when the
/// first code point does not fit.
fn encode_utf16_into(src: &[u16], dst: &mut [u8]) -> (usize, usize) {
    let mut read = 0;
    let mut written = 0;
    while read < src.len() {
        let (ch, units) = decode_utf16_at(src, read);
        let needed = ch.len_utf8();
        if written + needed > dst.len() {
            break;
        }
        ch.encode_utf8(&mut dst[written..written + needed]);
        written += needed;
        read += units;
    }
    (read, written)
}

/// Decode one code point at `index`, replacing lone surrogates.
fn decode_utf16_at(src: &[u16], index: usize) -> (char, usize) {
    let unit = src[index];
    match unit {
        0xD800..=0xDBFF => match src.get(index + 1) {
            Some(&low @ 0xDC00..=0xDFFF) => {
                let cp = 0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
                (char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER), 2)
            }
            _ => (char::REPLACEMENT_CHARACTER, 1),
        },
        0xDC00..=0xDFFF => (char::REPLACEMENT_CHARACTER, 1),
        _ => (
            char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER),
            1,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut arena = TextArena::new();
        let a = arena.push_str("hello");
        let b = arena.push_str("wörld");
        assert_eq!(arena.get(a), b"hello");
        assert_eq!(arena.get(b), "wörld".as_bytes());
        assert_eq!(b.offset, 5);
        assert_eq!(arena.len(), 5 + "wörld".len());
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut arena = TextArena::with_capacity(16);
        arena.push_str(&"x".repeat(100));
        let capacity = arena.capacity();
        arena.reset();
        assert!(arena.is_empty());
        assert_eq!(arena.capacity(), capacity);
        let s = arena.push_str("again");
        assert_eq!(s.offset, 0);
        assert_eq!(arena.get(s), b"again");
    }

    #[test]
    fn test_growth_doubles() {
        let mut arena = TextArena::with_capacity(MIN_CAPACITY);
        arena.push_str(&"a".repeat(MIN_CAPACITY + 1));
        assert_eq!(arena.capacity(), MIN_CAPACITY * 2);
        assert_eq!(arena.grow_count(), 1);
    }

    #[test]
    fn test_utf16_mid_codepoint_exhaustion_grows() {
        // One free byte remains and the single unit needs three bytes, so
        // the first encode step makes no progress.
        let mut arena = TextArena::with_capacity(MIN_CAPACITY);
        arena.push_str(&"a".repeat(MIN_CAPACITY - 1));
        let units: Vec<u16> = "日".encode_utf16().collect();
        assert_eq!(units.len(), 1);
        let s = arena.push_utf16(&units);
        assert_eq!(arena.get(s), "日".as_bytes());
        assert_eq!(arena.grow_count(), 1);
    }

    #[test]
    fn test_utf16_surrogate_pair_and_lone_surrogate() {
        let mut arena = TextArena::new();
        let pair: Vec<u16> = "😀".encode_utf16().collect();
        let s = arena.push_utf16(&pair);
        assert_eq!(arena.get(s), "😀".as_bytes());

        let s = arena.push_utf16(&[0xD800, u16::from(b'a')]);
        assert_eq!(arena.get(s), "\u{FFFD}a".as_bytes());
    }

    #[test]
    fn test_get_out_of_range_is_empty() {
        let arena = TextArena::new();
        assert!(arena.get(TextSlice { offset: 4, length: 10 }).is_empty());
    }
}
