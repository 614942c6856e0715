//! Text styling and word wrapping
//!
//! Pure functions; the width used for wrapping is always supplied by the
//! caller from the display's current column count.

use unicode_width::UnicodeWidthStr;

use crate::config::StyleTable;

/// Line separator understood by the display
pub const LINE_BREAK: &str = "\r\n";

/// Lines containing this marker are lists or tables and are never re-wrapped
const LIST_MARKER: &str = " - ";

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Byte length of the escape sequence at the start of `s`, if there is one.
///
/// Understands CSI (`ESC [ ... final`), OSC (`ESC ] ... BEL` or `ESC ] ... ESC \`)
/// and two-byte `ESC x` sequences. An unterminated sequence runs to the end.
pub fn escape_len(s: &str) -> Option<usize> {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, ESC)) => {}
        _ => return None,
    }
    match chars.next() {
        Some((_, '[')) => {
            for (i, ch) in chars {
                if ('\x40'..='\x7e').contains(&ch) {
                    return Some(i + ch.len_utf8());
                }
            }
            Some(s.len())
        }
        Some((_, ']')) => {
            let mut prev_esc = false;
            for (i, ch) in chars {
                if ch == BEL || (prev_esc && ch == '\\') {
                    return Some(i + ch.len_utf8());
                }
                prev_esc = ch == ESC;
            }
            Some(s.len())
        }
        Some((i, ch)) => Some(i + ch.len_utf8()),
        None => Some(s.len()),
    }
}

/// Split `s` into escape sequences and single characters, in order
pub fn segments(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let len = escape_len(rest).unwrap_or(first.len_utf8());
        let (head, tail) = rest.split_at(len);
        rest = tail;
        Some(head)
    })
}

/// Display width of `s`, not counting escape sequences
pub fn visible_width(s: &str) -> usize {
    segments(s)
        .filter(|seg| !seg.starts_with(ESC))
        .map(|seg| seg.width())
        .sum()
}

/// Wrap `text` in the codes for `tokens`, followed by a full reset.
///
/// Tokens compose by concatenation in the order given.
pub fn style(styles: &StyleTable, text: &str, tokens: &[&str]) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for token in tokens {
        out.push_str(styles.code(token));
    }
    out.push_str(text);
    out.push_str(styles.reset());
    out
}

/// Break `text` into lines no wider than `max_width`.
///
/// Breaks happen at spaces. A word wider than `max_width` is hard-split
/// every `max_width` columns. Lines that already fit, and lines holding
/// `" - "`, pass through untouched. Existing `\n` / `\r\n` breaks are kept
/// and every output line is joined with [`LINE_BREAK`]. Widths ignore
/// escape sequences, so styled text and hyperlinks wrap by what is visible.
pub fn wrap(text: &str, max_width: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if max_width == 0 || visible_width(line) <= max_width || line.contains(LIST_MARKER) {
            lines.push(line.to_string());
        } else {
            wrap_line(line, max_width, &mut lines);
        }
    }
    lines.join(LINE_BREAK)
}

fn wrap_line(line: &str, max_width: usize, out: &mut Vec<String>) {
    let first = out.len();
    let mut current = String::new();
    let mut current_width = 0;

    for word in line.split(' ').filter(|w| !w.is_empty()) {
        let word_width = visible_width(word);

        if word_width > max_width {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let mut chunks = hard_split(word, max_width);
            // The tail of a split word can still share a line with what follows
            let tail = chunks.pop().unwrap_or_default();
            out.extend(chunks);
            current_width = visible_width(&tail);
            current = tail;
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + 1 + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            out.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_width;
        }
    }

    // A blank line still takes up a row
    if !current.is_empty() || out.len() == first {
        out.push(current);
    }
}

/// Split a single word into pieces of at most `max_width` columns.
/// Escape sequences are never cut.
fn hard_split(word: &str, max_width: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0;

    for seg in segments(word) {
        let w = if seg.starts_with(ESC) { 0 } else { seg.width() };
        if w > 0 && width + w > max_width && !piece.is_empty() {
            pieces.push(std::mem::take(&mut piece));
            width = 0;
        }
        piece.push_str(seg);
        width += w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<&str> {
        text.split(LINE_BREAK).collect()
    }

    #[test]
    fn test_style_wraps_with_reset() {
        let styles = StyleTable::default();
        assert_eq!(
            style(&styles, "Sobhi@portfolio:~$ ", &["blue", "bold"]),
            "\x1b[34m\x1b[1mSobhi@portfolio:~$ \x1b[0m"
        );
        assert_eq!(style(&styles, "x", &[]), "x\x1b[0m");
    }

    #[test]
    fn test_wrap_empty() {
        assert_eq!(wrap("", 10), "");
    }

    #[test]
    fn test_wrap_fits_unchanged() {
        assert_eq!(wrap("hello world", 11), "hello world");
    }

    #[test]
    fn test_wrap_at_spaces() {
        let out = wrap("the quick brown fox jumps over", 10);
        assert_eq!(lines(&out), vec!["the quick", "brown fox", "jumps over"]);
    }

    #[test]
    fn test_wrap_hard_splits_long_word() {
        let out = wrap("abcdefghijklmnopqrstuvwxyz", 10);
        assert_eq!(lines(&out), vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
    }

    #[test]
    fn test_wrap_split_tail_joins_next_word() {
        let out = wrap("go abcdefghijkl ok", 10);
        assert_eq!(lines(&out), vec!["go", "abcdefghij", "kl ok"]);
    }

    #[test]
    fn test_wrap_list_lines_pass_through() {
        let line = "Frontend - React, Tailwind CSS, Three.js and a few more";
        assert_eq!(wrap(line, 20), line);
    }

    #[test]
    fn test_wrap_keeps_existing_breaks() {
        let out = wrap("one two three\nfour\r\n", 7);
        assert_eq!(lines(&out), vec!["one two", "three", "four", ""]);
    }

    #[test]
    fn test_wrap_keeps_wide_blank_lines() {
        let text = format!("a\n{}\nb", " ".repeat(50));
        assert_eq!(lines(&wrap(&text, 40)), vec!["a", "", "b"]);
    }

    #[test]
    fn test_escape_len() {
        assert_eq!(escape_len("plain"), None);
        assert_eq!(escape_len("\x1b[34mx"), Some(5));
        assert_eq!(escape_len("\x1b]8;;http://a\x1b\\x"), Some(15));
        assert_eq!(escape_len("\x1b]0;title\x07x"), Some(10));
        assert_eq!(escape_len("\x1b["), Some(2));
    }

    #[test]
    fn test_visible_width_skips_escapes() {
        let styles = StyleTable::default();
        assert_eq!(visible_width(&style(&styles, "hello", &["green", "bold"])), 5);
        assert_eq!(visible_width("\x1b]8;;https://x.dev\x1b\\site\x1b]8;;\x1b\\"), 4);
    }

    #[test]
    fn test_wrap_measures_without_escapes() {
        let styles = StyleTable::default();
        let word = style(&styles, "abcd", &["green"]);
        let text = format!("{0} {0}", word);
        // Nine visible columns fit even though the bytes do not
        assert_eq!(wrap(&text, 9), text);
        assert_eq!(lines(&wrap(&text, 8)), vec![word.as_str(), word.as_str()]);
    }

    #[test]
    fn test_wrap_hard_split_keeps_escapes_whole() {
        let link = "\x1b]8;;https://example.com\x1b\\abcdefghijkl\x1b]8;;\x1b\\";
        let out = wrap(link, 5);
        for line in lines(&out) {
            assert!(visible_width(line) <= 5, "{:?}", line);
        }
        assert_eq!(out.replace(LINE_BREAK, ""), link);
        assert!(out.starts_with("\x1b]8;;https://example.com\x1b\\abcde"));
    }

    #[test]
    fn test_wrap_never_exceeds_width() {
        let text = "I enjoy building reliable web applications end to end, from the \
                    database schema up to the last pixel of the interface, \
                    supercalifragilisticexpialidocious included.";
        for width in [5, 8, 13, 21, 40] {
            for line in lines(&wrap(text, width)) {
                assert!(line.width() <= width, "{:?} wider than {}", line, width);
            }
        }
    }
}
