//! Second pass: stream-copy the source, escaping outside classified regions.

use std::ops::Range;

use crate::region::{classify, Region, RegionKind};
use crate::validate::validate;

/// Prefix of a collapsed heading label (U+258E LEFT THREE EIGHTHS BLOCK).
pub const HEADING_GLYPH: &str = "\u{258e}";
/// Replacement for `-`, `*` and `+` list markers.
pub const BULLET_GLYPH: &str = "\u{2022}";

/// Characters that are literal in MarkdownV2 only when backslash-escaped.
/// The backslash itself is included: an unescaped one would swallow the
/// character that follows it.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

fn is_reserved(c: char) -> bool {
    RESERVED.contains(&c)
}

/// Escape every reserved character in `text`, with no other rewriting.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    escape_into(&mut out, text);
    out
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        if is_reserved(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}

/// Convert informal markdown to Telegram MarkdownV2.
///
/// Must be given the whole text: whether a character is inside a code fence
/// depends on everything before it, so transcoding a suffix on its own is
/// not meaningful.
pub fn transcode(source: &str) -> String {
    let regions = classify(source);
    let mut out = String::with_capacity(source.len() + source.len() / 8 + 16);
    let mut lines = LineState::default();
    let mut cursor = 0;

    for region in &regions {
        emit_plain(source, cursor..region.span.start, &mut out, &mut lines);
        if is_line_start(source.as_bytes(), region.span.start) {
            lines.in_bullet_run = false;
        }
        emit_region(source, region, &mut out);
        cursor = region.span.end;
    }
    emit_plain(source, cursor..source.len(), &mut out, &mut lines);

    debug_assert!(
        validate(&out).is_ok(),
        "transcoder produced invalid MarkdownV2: {:?}\nsource: {source:?}\noutput: {out:?}",
        validate(&out)
    );
    out
}

#[derive(Debug, Default)]
struct LineState {
    /// The previous line was a bullet item.
    in_bullet_run: bool,
}

fn is_line_start(bytes: &[u8], i: usize) -> bool {
    i == 0 || bytes[i - 1] == b'\n'
}

fn emit_region(source: &str, region: &Region, out: &mut String) {
    match &region.kind {
        RegionKind::Fence { inner, closed } => {
            if *closed {
                out.push_str(&source[region.span.clone()]);
            } else {
                let inner = &source[inner.clone()];
                out.push_str("```");
                out.push_str(inner);
                if !inner.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("```");
            }
        }
        RegionKind::Code => out.push_str(&source[region.span.clone()]),
        RegionKind::Link { label, target } => {
            out.push('[');
            out.push_str(&source[label.clone()]);
            out.push_str("](");
            out.push_str(&source[target.clone()]);
            out.push(')');
        }
        RegionKind::Heading { label } => {
            out.push_str(HEADING_GLYPH);
            out.push('*');
            escape_into(out, &source[label.clone()]);
            out.push('*');
        }
    }
}

/// Copy a span that lies outside every region, applying the list, bold and
/// escaping rules. Nothing written here is examined again.
fn emit_plain(source: &str, range: Range<usize>, out: &mut String, lines: &mut LineState) {
    let bytes = source.as_bytes();
    let mut i = range.start;

    while i < range.end {
        if is_line_start(bytes, i) {
            if let Some((indent_end, marker_end)) = bullet_marker(bytes, i, range.end) {
                if !lines.in_bullet_run && !out.is_empty() && !out.ends_with("\n\n") {
                    out.push('\n');
                }
                out.push_str(&source[i..indent_end]);
                out.push_str(BULLET_GLYPH);
                out.push(' ');
                lines.in_bullet_run = true;
                i = marker_end;
                continue;
            }
            lines.in_bullet_run = false;
        }

        if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'*') {
            if let Some(close) = bold_close(bytes, i, range.end) {
                out.push('*');
                escape_into(out, &source[i + 2..close]);
                out.push('*');
                i = close + 2;
                continue;
            }
        }

        // `i` is always on a char boundary: every jump above lands after ASCII.
        let Some(ch) = source[i..].chars().next() else {
            break;
        };
        if is_reserved(ch) {
            out.push('\\');
        }
        out.push(ch);
        i += ch.len_utf8();
    }
}

/// `-`, `*` or `+` followed by a space, after optional indentation.
/// Returns (end of indentation, end of marker).
fn bullet_marker(bytes: &[u8], start: usize, end: usize) -> Option<(usize, usize)> {
    let mut i = start;
    while i < end && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    if i + 1 < end && matches!(bytes[i], b'-' | b'*' | b'+') && bytes[i + 1] == b' ' {
        Some((i, i + 2))
    } else {
        None
    }
}

/// Offset of the `**` closing a bold run opened at `open`, on the same line
/// and with non-empty content.
fn bold_close(bytes: &[u8], open: usize, end: usize) -> Option<usize> {
    let content_start = open + 2;
    let mut j = content_start;
    while j + 1 < end {
        match bytes[j] {
            b'\n' => return None,
            b'*' if bytes[j + 1] == b'*' => {
                return (j > content_start).then_some(j);
            }
            _ => j += 1,
        }
    }
    None
}
