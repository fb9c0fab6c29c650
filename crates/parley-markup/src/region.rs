//! First pass: locate the spans the escaping pass must not touch.

use std::ops::Range;

const FENCE: &[u8] = b"```";
const MAX_HEADING_LEVEL: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionKind {
    /// Triple-backtick block. `closed` is false when the input ends inside it.
    Fence { inner: Range<usize>, closed: bool },
    /// Single-backtick span on one line.
    Code,
    /// `[label](target)` or `![label](target)`.
    Link {
        label: Range<usize>,
        target: Range<usize>,
    },
    /// A heading collapsed to its first word. Line-start headings span the
    /// whole line; a mid-line `#word` spans only the marker and the word.
    Heading { label: Range<usize> },
}

/// A classified span of the source, in byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub span: Range<usize>,
}

/// Scan `source` left to right and return its non-overlapping regions,
/// ordered by start offset.
///
/// Everything inside a fence is masked, including backticks, so code spans
/// and links are never found inside one.
pub fn classify(source: &str) -> Vec<Region> {
    let bytes = source.as_bytes();
    let mut regions = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let at_line_start = i == 0 || bytes[i - 1] == b'\n';
        if at_line_start {
            if let Some(region) = heading_line(source, i) {
                i = region.span.end;
                regions.push(region);
                continue;
            }
        }

        let found = match bytes[i] {
            b'`' if bytes[i..].starts_with(FENCE) => Some(fence(source, i)),
            b'`' => inline_code(bytes, i),
            b'[' => parse_link(bytes, i).map(|(label, target, end)| Region {
                kind: RegionKind::Link { label, target },
                span: i..end,
            }),
            b'!' if bytes.get(i + 1) == Some(&b'[') => {
                parse_link(bytes, i + 1).map(|(label, target, end)| Region {
                    kind: RegionKind::Link { label, target },
                    span: i..end,
                })
            }
            b'#' if i > 0 && matches!(bytes[i - 1], b' ' | b'\t') => inline_heading(source, i),
            _ => None,
        };

        match found {
            Some(region) => {
                i = region.span.end;
                regions.push(region);
            }
            None => i += 1,
        }
    }

    regions
}

fn fence(source: &str, start: usize) -> Region {
    let inner_start = start + FENCE.len();
    match source[inner_start..].find("```") {
        Some(pos) => Region {
            kind: RegionKind::Fence {
                inner: inner_start..inner_start + pos,
                closed: true,
            },
            span: start..inner_start + pos + FENCE.len(),
        },
        None => Region {
            kind: RegionKind::Fence {
                inner: inner_start..source.len(),
                closed: false,
            },
            span: start..source.len(),
        },
    }
}

fn inline_code(bytes: &[u8], start: usize) -> Option<Region> {
    let close = bytes[start + 1..]
        .iter()
        .position(|&b| b == b'`' || b == b'\n')
        .map(|p| start + 1 + p)?;
    // Empty spans are rejected by Telegram; leave them to the escaper.
    if bytes[close] != b'`' || close == start + 1 {
        return None;
    }
    Some(Region {
        kind: RegionKind::Code,
        span: start..close + 1,
    })
}

/// Parse `[label](target)` with the opening bracket at `bracket`.
///
/// The label stops at the first `]` and may not contain `[` or a newline;
/// the target stops at the first `)` and may not contain a newline. Either
/// may be empty. Returns the label range, target range and the end offset.
pub(crate) fn parse_link(
    bytes: &[u8],
    bracket: usize,
) -> Option<(Range<usize>, Range<usize>, usize)> {
    let label_start = bracket + 1;
    let label_end = bytes[label_start..]
        .iter()
        .position(|&b| matches!(b, b']' | b'[' | b'\n'))
        .map(|p| label_start + p)?;
    if bytes[label_end] != b']' || bytes.get(label_end + 1) != Some(&b'(') {
        return None;
    }

    let target_start = label_end + 2;
    let target_end = bytes[target_start..]
        .iter()
        .position(|&b| matches!(b, b')' | b'\n'))
        .map(|p| target_start + p)?;
    if bytes[target_end] != b')' {
        return None;
    }

    Some((label_start..label_end, target_start..target_end, target_end + 1))
}

/// `#`-run at the start of a line (after optional indentation) followed by a
/// word. Without a space after the hashes the word must start alphanumeric,
/// so `#!/bin/sh` stays literal.
fn heading_line(source: &str, start: usize) -> Option<Region> {
    let bytes = source.as_bytes();
    let line_end = bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p);

    let mut i = start;
    while i < line_end && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    let hashes = bytes[i..line_end].iter().take_while(|&&b| b == b'#').count();
    if hashes == 0 || hashes > MAX_HEADING_LEVEL {
        return None;
    }
    i += hashes;

    let spaced = i < line_end && matches!(bytes[i], b' ' | b'\t');
    while i < line_end && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    if i == line_end {
        return None;
    }
    if !spaced && !source[i..].starts_with(char::is_alphanumeric) {
        return None;
    }

    let token_end = source[i..line_end]
        .find(char::is_whitespace)
        .map_or(line_end, |p| i + p);
    let label = trim_emphasis(source, i..token_end)?;

    Some(Region {
        kind: RegionKind::Heading { label },
        span: start..line_end,
    })
}

/// `#word` in the middle of a line, preceded by whitespace.
fn inline_heading(source: &str, start: usize) -> Option<Region> {
    let bytes = source.as_bytes();
    let hashes = bytes[start..].iter().take_while(|&&b| b == b'#').count();
    let word_start = start + hashes;
    let word_len: usize = source[word_start..]
        .chars()
        .take_while(|c| c.is_alphanumeric())
        .map(char::len_utf8)
        .sum();
    if word_len == 0 {
        return None;
    }

    Some(Region {
        kind: RegionKind::Heading {
            label: word_start..word_start + word_len,
        },
        span: start..word_start + word_len,
    })
}

/// Strip `*` and `_` wrapped around a heading word; `None` if nothing is left.
fn trim_emphasis(source: &str, range: Range<usize>) -> Option<Range<usize>> {
    let token = &source[range.clone()];
    let trimmed_start = token.trim_start_matches(['*', '_']);
    let start = range.start + (token.len() - trimmed_start.len());
    let trimmed = trimmed_start.trim_end_matches(['*', '_']);
    if trimmed.is_empty() {
        return None;
    }
    Some(start..start + trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(RegionKind, &str)> {
        classify(source)
            .into_iter()
            .map(|r| {
                let text = &source[r.span.clone()];
                (r.kind, text)
            })
            .collect()
    }

    #[test]
    fn fence_masks_backticks_and_links() {
        let src = "a ```\n`x` [l](t)\n``` b";
        let regions = classify(src);
        assert_eq!(regions.len(), 1);
        assert_eq!(&src[regions[0].span.clone()], "```\n`x` [l](t)\n```");
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let src = "text\n```rust\nfn main() {";
        let regions = classify(src);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].span.end, src.len());
        assert!(matches!(regions[0].kind, RegionKind::Fence { closed: false, .. }));
    }

    #[test]
    fn inline_code_stays_on_one_line() {
        assert!(classify("a `b\nc` d").is_empty());
        assert_eq!(kinds("a `b` c"), vec![(RegionKind::Code, "`b`")]);
    }

    #[test]
    fn empty_inline_code_is_not_a_region() {
        assert!(classify("a `` b").is_empty());
    }

    #[test]
    fn link_and_image_ranges() {
        let src = "see ![alt](img.png) and [](x)";
        let regions = classify(src);
        assert_eq!(regions.len(), 2);
        match &regions[0].kind {
            RegionKind::Link { label, target } => {
                assert_eq!(&src[label.clone()], "alt");
                assert_eq!(&src[target.clone()], "img.png");
            }
            other => panic!("expected link, got {other:?}"),
        }
        assert_eq!(&src[regions[1].span.clone()], "[](x)");
    }

    #[test]
    fn malformed_link_is_not_a_region() {
        assert!(classify("[label] (target)").is_empty());
        assert!(classify("[label](target").is_empty());
        assert!(classify("[la\nbel](t)").is_empty());
    }

    #[test]
    fn heading_line_keeps_first_word() {
        let src = "## Getting started now\nbody";
        let regions = classify(src);
        assert_eq!(regions[0].span, 0..22);
        match &regions[0].kind {
            RegionKind::Heading { label } => assert_eq!(&src[label.clone()], "Getting"),
            other => panic!("expected heading, got {other:?}"),
        }
    }

    #[test]
    fn heading_word_loses_emphasis_markers() {
        let src = "# **Intro**";
        match &classify(src)[0].kind {
            RegionKind::Heading { label } => assert_eq!(&src[label.clone()], "Intro"),
            other => panic!("expected heading, got {other:?}"),
        }
    }

    #[test]
    fn shebang_and_deep_hashes_are_not_headings() {
        assert!(classify("#!/bin/sh").is_empty());
        assert!(classify("####### seven").is_empty());
        assert!(classify("#").is_empty());
    }

    #[test]
    fn mid_line_hash_word_is_heading() {
        let src = "**Hello** #World\n";
        let regions = classify(src);
        assert_eq!(regions.len(), 1);
        assert_eq!(&src[regions[0].span.clone()], "#World");
    }

    #[test]
    fn hash_glued_to_text_is_plain() {
        assert!(classify("C# rocks").is_empty());
        assert!(classify("a # b").is_empty());
    }
}
