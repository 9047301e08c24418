//! Word wrapping and overflow truncation by cell width.

use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;

use super::width::{grapheme_width, text_width};

/// How text that does not fit its width is shortened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextOverflow {
    /// Cut at the last grapheme that fits.
    #[default]
    Clip,
    /// Cut and end with `…`.
    Ellipsis,
    /// Keep head and tail, with `…` in between.
    Middle,
}

const ELLIPSIS: &str = "…";

/// Wrap `text` into lines no wider than `width` cells.
///
/// Breaks at spaces where possible and inside words that are longer than
/// the width. Hard line breaks (`\n`) always start a new line. Every
/// paragraph yields at least one (possibly empty) line. A width of zero
/// yields no lines.
pub fn wrap(text: &str, width: usize) -> Vec<&str> {
    let mut lines = Vec::new();
    if width == 0 {
        return lines;
    }
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph.trim_end_matches('\r'), width, &mut lines);
    }
    lines
}

/// Number of lines and widest line after wrapping at `width`.
pub fn wrapped_size(text: &str, width: usize) -> (usize, usize) {
    let lines = wrap(text, width);
    let widest = lines.iter().map(|l| text_width(l)).max().unwrap_or(0);
    (lines.len(), widest)
}

fn wrap_paragraph<'a>(paragraph: &'a str, width: usize, out: &mut Vec<&'a str>) {
    let first_line = out.len();
    let mut start = 0;
    let mut line_width = 0;
    // Soft break candidate: (end of current line, start of next line).
    let mut soft_break: Option<(usize, usize)> = None;
    let mut since_break = 0;

    for (idx, grapheme) in paragraph.grapheme_indices(true) {
        let gw = grapheme_width(grapheme);
        if grapheme == " " {
            if line_width + gw > width {
                out.push(paragraph[start..idx].trim_end());
                start = idx + grapheme.len();
                line_width = 0;
                soft_break = None;
            } else {
                soft_break = Some((idx, idx + grapheme.len()));
                line_width += gw;
            }
            since_break = 0;
            continue;
        }

        if line_width + gw > width {
            if let Some((end, next)) = soft_break.take() {
                out.push(paragraph[start..end].trim_end());
                start = next;
                line_width = since_break;
            }
            if line_width + gw > width && line_width > 0 {
                out.push(&paragraph[start..idx]);
                start = idx;
                line_width = 0;
            }
            since_break = line_width;
        }
        line_width += gw;
        since_break += gw;
    }

    if start < paragraph.len() || out.len() == first_line {
        out.push(paragraph[start..].trim_end());
    }
}

/// Shorten `text` to at most `width` cells.
///
/// Returns the input unchanged when it already fits.
pub fn truncate(text: &str, width: usize, overflow: TextOverflow) -> Cow<'_, str> {
    if text_width(text) <= width {
        return Cow::Borrowed(text);
    }
    match overflow {
        TextOverflow::Clip => Cow::Borrowed(take_head(text, width)),
        TextOverflow::Ellipsis => {
            if width == 0 {
                return Cow::Borrowed("");
            }
            let head = take_head(text, width - 1);
            Cow::Owned(format!("{head}{ELLIPSIS}"))
        }
        TextOverflow::Middle => {
            if width == 0 {
                return Cow::Borrowed("");
            }
            let budget = width - 1;
            let head = take_head(text, budget.div_ceil(2));
            let tail = take_tail(text, budget / 2);
            Cow::Owned(format!("{head}{ELLIPSIS}{tail}"))
        }
    }
}

/// Longest prefix fitting in `width` cells.
fn take_head(text: &str, width: usize) -> &str {
    let mut used = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        let gw = grapheme_width(grapheme);
        if used + gw > width {
            return &text[..idx];
        }
        used += gw;
    }
    text
}

/// Longest suffix fitting in `width` cells.
fn take_tail(text: &str, width: usize) -> &str {
    let mut used = 0;
    let mut start = text.len();
    for (idx, grapheme) in text.grapheme_indices(true).rev() {
        let gw = grapheme_width(grapheme);
        if used + gw > width {
            break;
        }
        used += gw;
        start = idx;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_words() {
        assert_eq!(wrap("hello brave new world", 11), vec!["hello brave", "new world"]);
    }

    #[test]
    fn test_wrap_long_word_breaks() {
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_wrap_hard_breaks_and_empty() {
        assert_eq!(wrap("a\n\nb", 5), vec!["a", "", "b"]);
        assert_eq!(wrap("", 5), vec![""]);
        assert!(wrap("abc", 0).is_empty());
    }

    #[test]
    fn test_wrap_fits_unchanged() {
        assert_eq!(wrap("short", 80), vec!["short"]);
    }

    #[test]
    fn test_wrap_wide_chars() {
        assert_eq!(wrap("日本語です", 4), vec!["日本", "語で", "す"]);
    }

    #[test]
    fn test_wrapped_size() {
        assert_eq!(wrapped_size("aa bb cc", 5), (2, 5));
    }

    #[test]
    fn test_truncate_modes() {
        assert_eq!(truncate("hello world", 20, TextOverflow::Ellipsis), "hello world");
        assert_eq!(truncate("hello world", 5, TextOverflow::Clip), "hello");
        assert_eq!(truncate("hello world", 6, TextOverflow::Ellipsis), "hello…");
        assert_eq!(truncate("hello world", 7, TextOverflow::Middle), "hel…rld");
        assert_eq!(truncate("hello", 0, TextOverflow::Ellipsis), "");
    }

    #[test]
    fn test_truncate_wide_boundary() {
        // A wide grapheme never straddles the cut.
        assert_eq!(truncate("日本語", 3, TextOverflow::Clip), "日");
        assert_eq!(truncate("日本語", 4, TextOverflow::Ellipsis), "日…");
    }
}
