//! Cell-width measurement for terminal text.
//!
//! Every text run gets a width in terminal cells:
//! - `2` for wide graphemes (CJK ideographs, fullwidth forms, emoji)
//! - `0` for combining marks, zero-width and control characters
//! - `1` for everything else, including each unit of malformed input
//!
//! The exact outputs are pinned by [`TEXT_MEASURE_VERSION`]. Any change to
//! the rules below must bump it, since layout results and golden fixtures
//! depend on it.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Version of the width algorithm.
pub const TEXT_MEASURE_VERSION: u32 = 2;

/// Display width of a single code point.
#[inline]
pub fn char_width(c: char) -> usize {
    // Symbols and dingbats (U+2600..U+27BF) follow unicode-width: only the
    // emoji-presentation ones (⚡, ✨) are wide, text symbols (✓, ☐) are not.
    match c as u32 {
        // Pictographs, emoticons, transport
        0x1F300..=0x1F64F | 0x1F680..=0x1F6FF => 2,
        // Supplemental pictographs
        0x1F900..=0x1F9FF | 0x1FA70..=0x1FAFF => 2,
        _ => c.width().unwrap_or(0),
    }
}

/// Display width of one grapheme cluster.
///
/// Emoji sequences (ZWJ, VS16, skin tones, keycaps, flags) are wide; a base
/// character followed by combining marks keeps the base's width.
pub fn grapheme_width(grapheme: &str) -> usize {
    let mut chars = grapheme.chars();
    let Some(first) = chars.next() else {
        return 0;
    };
    if grapheme.len() == first.len_utf8() {
        return char_width(first);
    }
    if (0x1F1E6..=0x1F1FF).contains(&(first as u32)) {
        return 2;
    }
    for c in chars {
        match c as u32 {
            0x200D | 0xFE0F | 0x1F3FB..=0x1F3FF | 0x20E3 => return 2,
            _ => {}
        }
    }
    char_width(first)
}

/// Display width of a string in cells.
pub fn text_width(text: &str) -> usize {
    if text.is_ascii() {
        return text.bytes().filter(|&b| (0x20..0x7F).contains(&b)).count();
    }
    text.graphemes(true).map(grapheme_width).sum()
}

/// Display width of UTF-16 code units.
///
/// Well-formed runs are measured like [`text_width`]; every unpaired
/// surrogate counts as one cell. Never fails.
pub fn text_width_utf16(units: &[u16]) -> usize {
    let mut total = 0;
    let mut run = String::new();
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(c) => run.push(c),
            Err(_) => {
                total += text_width(&run) + 1;
                run.clear();
            }
        }
    }
    total + text_width(&run)
}

/// Display width of possibly malformed UTF-8.
///
/// Every byte of an invalid sequence counts as one cell.
pub fn text_width_bytes(mut bytes: &[u8]) -> usize {
    let mut total = 0;
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => return total + text_width(valid),
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                total += std::str::from_utf8(valid).map_or(0, text_width);
                let bad = err.error_len().unwrap_or(rest.len());
                total += bad;
                bytes = &rest[bad..];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Golden outputs for `TEXT_MEASURE_VERSION == 2`.
    const GOLDEN_V2: &[(&str, usize)] = &[
        ("", 0),
        ("hello", 5),
        ("a\tb", 2),
        ("日本語", 6),
        ("e\u{301}", 1),
        ("\u{301}", 0),
        ("👍", 2),
        ("👨\u{200D}👩\u{200D}👧", 2),
        ("🇺🇸", 2),
        ("1\u{FE0F}\u{20E3}", 2),
        ("ｆｕｌｌ", 8),
        ("한글", 4),
        ("⚡ok", 4),
        ("✨", 2),
        ("✓ done", 6),
        ("☐ todo", 6),
        ("✔✘", 2),
        ("Ω≈ç", 3),
    ];

    #[test]
    fn test_golden_fixtures_v2() {
        assert_eq!(TEXT_MEASURE_VERSION, 2, "bump fixtures with the version");
        for &(input, expected) in GOLDEN_V2 {
            assert_eq!(text_width(input), expected, "width of {input:?}");
        }
    }

    #[test]
    fn test_char_width_classes() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width('你'), 2);
        assert_eq!(char_width('\u{301}'), 0);
        assert_eq!(char_width('\n'), 0);
    }

    #[test]
    fn test_utf16_lone_surrogates_count_one() {
        assert_eq!(text_width_utf16(&[0xD800]), 1);
        assert_eq!(text_width_utf16(&[0xDC00, 0xDC00]), 2);
        let mut units: Vec<u16> = "ab".encode_utf16().collect();
        units.push(0xD83D);
        units.extend("日".encode_utf16());
        assert_eq!(text_width_utf16(&units), 2 + 1 + 2);
    }

    #[test]
    fn test_utf16_valid_pair_is_wide() {
        let units: Vec<u16> = "😀".encode_utf16().collect();
        assert_eq!(text_width_utf16(&units), 2);
    }

    #[test]
    fn test_bytes_invalid_sequences() {
        assert_eq!(text_width_bytes(b"ok"), 2);
        assert_eq!(text_width_bytes(&[b'a', 0xFF, 0xFE, b'b']), 4);
        // Truncated three-byte sequence at the end.
        assert_eq!(text_width_bytes(&[b'a', 0xE6, 0x97]), 3);
    }
}
