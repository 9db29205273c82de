//! Line-oriented UDP encoder/decoder (spec §4.1, §6).
//!
//! A line is `"TAG f1 f2 … fk\n"`: fields separated by a single space, no
//! leading or repeated spaces, terminated by a single `\n`. Both UDP
//! requests and UDP replies use this framing directly; TCP replies that are
//! single-line (`RUL`, `RPT`) reuse [`encode_line`] too, while multi-segment
//! TCP replies (`RRT`) are assembled by hand in the TCP handlers since they
//! interleave raw binary payloads between framed fields.

/// Encode `tag` followed by `fields` into `"TAG f1 f2 … fk\n"`.
pub fn encode_line(tag: &str, fields: &[&str]) -> Vec<u8> {
    let mut out = String::with_capacity(tag.len() + fields.iter().map(|f| f.len() + 1).sum::<usize>() + 1);
    out.push_str(tag);
    for field in fields {
        out.push(' ');
        out.push_str(field);
    }
    out.push('\n');
    out.into_bytes()
}

/// Split a received line into its tag and space-separated fields, stripping
/// exactly one trailing `\n` (and a `\r` if present, for leniency with
/// clients that send CRLF). Returns `None` for an empty input.
pub fn decode_line(bytes: &[u8]) -> Option<(String, Vec<String>)> {
    let text = std::str::from_utf8(bytes).ok()?;
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);
    if text.is_empty() {
        return None;
    }
    let mut parts = text.split(' ');
    let tag = parts.next()?.to_owned();
    let fields = parts.map(|s| s.to_owned()).collect();
    Some((tag, fields))
}
