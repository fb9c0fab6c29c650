use crate::error::TranscodeInvariantViolation;
use crate::region::parse_link;

/// Reserved characters that must be escaped wherever they are not markup.
/// `*`, `` ` `` and `[` are handled separately as delimiters.
const MUST_ESCAPE: &[u8] = b"_]()~>#+-=|{}.!";

/// Check `markup` against the subset of MarkdownV2 the transcoder emits.
///
/// Accepted constructs: backslash escapes, ```` ``` ```` fences, single
/// backtick code spans, `[label](target)` links and `*bold*` runs. Any other
/// reserved character is a violation.
pub fn validate(markup: &str) -> Result<(), TranscodeInvariantViolation> {
    let bytes = markup.as_bytes();
    let mut bold_open: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if i + 1 >= bytes.len() {
                    return Err(TranscodeInvariantViolation::DanglingEscape { offset: i });
                }
                // A multi-byte escaped char leaves continuation bytes behind;
                // they are never reserved, so skipping one byte is enough.
                i += 2;
            }
            b'`' if bytes[i..].starts_with(b"```") => {
                let close = markup[i + 3..]
                    .find("```")
                    .ok_or(TranscodeInvariantViolation::UnclosedCode { offset: i })?;
                i += 3 + close + 3;
            }
            b'`' => {
                let close = bytes[i + 1..]
                    .iter()
                    .position(|&b| b == b'`')
                    .ok_or(TranscodeInvariantViolation::UnclosedCode { offset: i })?;
                i += 1 + close + 1;
            }
            b'[' => {
                let (_, _, end) = parse_link(bytes, i)
                    .ok_or(TranscodeInvariantViolation::Unescaped { offset: i, found: '[' })?;
                i = end;
            }
            b'*' => {
                bold_open = match bold_open {
                    Some(_) => None,
                    None => Some(i),
                };
                i += 1;
            }
            b if MUST_ESCAPE.contains(&b) => {
                return Err(TranscodeInvariantViolation::Unescaped {
                    offset: i,
                    found: b as char,
                });
            }
            _ => i += 1,
        }
    }

    match bold_open {
        Some(offset) => Err(TranscodeInvariantViolation::UnbalancedBold { offset }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::transcode;

    #[test]
    fn accepts_escaped_text_and_markup() {
        assert!(validate(r"Hello\. *bold* `a.b` [x](http://y.z)").is_ok());
        assert!(validate("```\nlet x = (1 + 2);\n```").is_ok());
        assert!(validate("").is_ok());
    }

    #[test]
    fn rejects_bare_reserved_character() {
        assert_eq!(
            validate("end."),
            Err(TranscodeInvariantViolation::Unescaped {
                offset: 3,
                found: '.'
            })
        );
        assert!(matches!(
            validate("[a] b"),
            Err(TranscodeInvariantViolation::Unescaped { found: '[', .. })
        ));
    }

    #[test]
    fn rejects_dangling_backslash() {
        assert_eq!(
            validate(r"abc\"),
            Err(TranscodeInvariantViolation::DanglingEscape { offset: 3 })
        );
    }

    #[test]
    fn rejects_unclosed_code() {
        assert!(matches!(
            validate("```\nno end"),
            Err(TranscodeInvariantViolation::UnclosedCode { offset: 0 })
        ));
        assert!(matches!(
            validate("a `b"),
            Err(TranscodeInvariantViolation::UnclosedCode { offset: 2 })
        ));
    }

    #[test]
    fn rejects_unbalanced_bold() {
        assert_eq!(
            validate("*open"),
            Err(TranscodeInvariantViolation::UnbalancedBold { offset: 0 })
        );
    }

    #[test]
    fn escaped_multibyte_char_is_fine() {
        assert!(validate("\\\u{2022} ok").is_ok());
    }

    #[test]
    fn transcoder_output_always_validates() {
        let inputs = [
            "# Title\nSome *text* with_underscores and (parens).",
            "**a** **b** ** c",
            "```rust\nfn main() { println!(\"hi\"); }\n```\nafter.",
            "unterminated ```py\nx = [1, 2",
            "[]() ![img](u) [bad] (link)",
            "- one\n- two\n\n1. three\n> quote",
            "back\\slash `code\\` end",
            "####### not a heading #tag #",
            "````",
            "`` ` `",
        ];
        for input in inputs {
            let out = transcode(input);
            assert!(validate(&out).is_ok(), "{input:?} -> {out:?}");
        }
    }
}
