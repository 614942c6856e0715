//! Web links
//!
//! Marks `http://` and `https://` URLs in response text with OSC 8
//! hyperlink sequences (`ESC ] 8 ; ; URI ST text ESC ] 8 ; ; ST`).
//! Hosts that understand OSC 8 make the text clickable; others ignore
//! the sequence and show the plain URL.

const SCHEMES: [&str; 2] = ["https://", "http://"];

/// Punctuation that ends a sentence rather than a URL
const TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '\'', '"'];

/// Ends the current hyperlink
pub const CLOSE_LINK: &str = "\x1b]8;;\x1b\\";

/// Starts a hyperlink to `uri`
pub fn open_link(uri: &str) -> String {
    format!("\x1b]8;;{}\x1b\\", uri)
}

/// Wrap every URL in `text` in a hyperlink to itself
pub fn linkify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((start, len)) = find_url(rest) {
        let url = &rest[start..start + len];
        out.push_str(&rest[..start]);
        out.push_str(&open_link(url));
        out.push_str(url);
        out.push_str(CLOSE_LINK);
        rest = &rest[start + len..];
    }
    out.push_str(rest);
    out
}

/// Byte offset and length of the first URL in `s`
fn find_url(s: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while from < s.len() {
        let (start, scheme_len) = SCHEMES
            .iter()
            .filter_map(|scheme| s[from..].find(scheme).map(|i| (from + i, scheme.len())))
            .min_by_key(|&(i, _)| i)?;

        // "xhttps://" is not a URL start
        let at_boundary = s[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());

        let body = &s[start..];
        let end = body
            .find(|c: char| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"'))
            .unwrap_or(body.len());
        let url = body[..end].trim_end_matches(TRAILING);

        if at_boundary && url.len() > scheme_len {
            return Some((start, url.len()));
        }
        from = start + scheme_len;
    }
    None
}
