use thiserror::Error;

/// The transcoder produced text the target grammar rejects.
///
/// Always a bug in the transcoder, never an input problem: `transcode`
/// checks its own output with a `debug_assert!`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscodeInvariantViolation {
    #[error("unescaped reserved character {found:?} at byte {offset}")]
    Unescaped { offset: usize, found: char },

    #[error("escape prefix at byte {offset} has nothing to escape")]
    DanglingEscape { offset: usize },

    #[error("code span opened at byte {offset} is never closed")]
    UnclosedCode { offset: usize },

    #[error("bold delimiter at byte {offset} is never closed")]
    UnbalancedBold { offset: usize },
}
