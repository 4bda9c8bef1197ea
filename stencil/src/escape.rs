//! HTML escaping for interpolated values

use crate::config::Escape;

/// Append `text` to `out`, escaping `&` `<` `>` `"` `'`.
pub fn escape_html(out: &mut String, text: &str) {
    let mut last = 0;
    for (i, b) in text.bytes().enumerate() {
        let entity = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        out.push_str(&text[last..i]);
        out.push_str(entity);
        last = i + 1;
    }
    out.push_str(&text[last..]);
}

/// Append `text` under the given policy.
pub(crate) fn write_escaped(out: &mut String, text: &str, escape: Escape) {
    match escape {
        Escape::Html => escape_html(out, text),
        Escape::Disabled => out.push_str(text),
    }
}
