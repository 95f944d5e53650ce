//! HTML escaping for feed-sourced strings.
//!
//! Every value taken from the feed document passes through [`escape_html`]
//! before it is interpolated into markup, both in text content and in
//! attribute values.

/// Escape `& < > " '` to their entity equivalents.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape a value destined for an attribute. Same rules as [`escape_html`].
pub fn escape_attr(s: &str) -> String {
    escape_html(s)
}
