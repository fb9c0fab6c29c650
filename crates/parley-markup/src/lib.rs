//! Informal markdown → Telegram MarkdownV2.
//!
//! [`transcode`] is a pure function over the full text: one pass classifies
//! code fences, inline code, links and headings into a span index, a second
//! pass stream-copies the source and escapes everything outside those spans.

pub mod chunk;
pub mod error;
pub mod region;
pub mod transcode;
pub mod validate;

pub use chunk::{split_chunks_smart, transcode_chunks, MarkupChunk};
pub use error::TranscodeInvariantViolation;
pub use region::{classify, Region, RegionKind};
pub use transcode::{escape_markdown_v2, transcode, BULLET_GLYPH, HEADING_GLYPH};
pub use validate::validate;
