//! Code-fence-aware splitting of over-long replies.
//!
//! Splitting happens on the raw text, before transcoding: a split point is
//! only safe where no escape sequence or code span can be cut in half.

use std::ops::Range;

use tracing::warn;

use crate::region::{classify, RegionKind};
use crate::transcode::transcode;

/// Below this budget chunks stop shrinking; a single escaped char can cost
/// two bytes, so very small budgets would never converge anyway.
const MIN_CHUNK: usize = 64;
/// `"\n```"` appended when a chunk ends inside a fence.
const FENCE_CLOSE_LEN: usize = 4;

/// Split `text` into chunks of at most `max` bytes, preferring line breaks.
///
/// When a split falls inside a fenced code block, the fence is closed before
/// the chunk boundary and re-opened (with its language tag) at the start of
/// the next chunk. A single line longer than `max` is force-split at the last
/// space, or at a char boundary if there is none.
pub fn split_chunks_smart(text: &str, max: usize) -> Vec<String> {
    let max = max.max(MIN_CHUNK);
    if text.len() <= max {
        return vec![text.to_string()];
    }

    let fences = fence_bodies(text);
    let mut next_fence = 0;
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut fence_lang: Option<String> = None;
    let mut offset = 0;

    for line in text.split('\n') {
        let cost = if current.is_empty() {
            line.len()
        } else {
            1 + line.len()
        };
        let reserve = if fence_lang.is_some() { FENCE_CLOSE_LEN } else { 0 };

        if !current.is_empty() && current.len() + cost + reserve > max {
            if fence_lang.is_some() {
                current.push_str("\n```");
            }
            chunks.push(std::mem::take(&mut current));
            if let Some(lang) = &fence_lang {
                current.push_str("```");
                current.push_str(lang);
            }
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);

        // The line break after this line, and whether a fence spans it.
        let newline = offset + line.len();
        while next_fence < fences.len() && fences[next_fence].0.end <= newline {
            next_fence += 1;
        }
        fence_lang = fences
            .get(next_fence)
            .filter(|(inner, _)| inner.start <= newline)
            .map(|(_, lang)| lang.clone());
        offset = newline + 1;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    let mut result = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.len() <= max {
            result.push(chunk);
            continue;
        }
        let mut remaining = chunk.as_str();
        while remaining.len() > max {
            let limit = floor_char_boundary(remaining, max);
            let split_at = remaining[..limit]
                .rfind('\n')
                .or_else(|| remaining[..limit].rfind(' '))
                .filter(|&at| at > 0)
                .unwrap_or(limit);
            result.push(remaining[..split_at].to_string());
            remaining = remaining[split_at..].trim_start();
        }
        if !remaining.is_empty() {
            result.push(remaining.to_string());
        }
    }

    result
}

/// Body ranges of every fence `classify` finds, with the language tag to
/// reopen them with. Fences may open mid-line, so line prefixes alone cannot
/// tell openers from closers.
fn fence_bodies(text: &str) -> Vec<(Range<usize>, String)> {
    classify(text)
        .into_iter()
        .filter_map(|region| match region.kind {
            RegionKind::Fence { inner, .. } => {
                let lang = text[inner.clone()]
                    .split('\n')
                    .next()
                    .and_then(|first| first.split_whitespace().next())
                    .unwrap_or("")
                    .to_string();
                Some((inner, lang))
            }
            _ => None,
        })
        .collect()
}

/// Largest char boundary of `s` that is `<= index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// One outbound message: the raw slice and its transcoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupChunk {
    pub raw: String,
    pub markup: String,
}

/// Split `raw` so that every transcoded chunk fits in `limit` bytes.
///
/// Escaping grows the text, so the raw budget is halved until the markup of
/// every chunk fits. Each chunk is transcoded on its own, which is safe
/// because the splitter closes and re-opens fences at chunk boundaries.
pub fn transcode_chunks(raw: &str, limit: usize) -> Vec<MarkupChunk> {
    let mut budget = limit;
    loop {
        let chunks: Vec<MarkupChunk> = split_chunks_smart(raw, budget)
            .into_iter()
            .map(|raw| MarkupChunk {
                markup: transcode(&raw),
                raw,
            })
            .collect();

        let fits = chunks.iter().all(|c| c.markup.len() <= limit);
        if fits || budget <= MIN_CHUNK {
            if !fits {
                warn!(limit, "markup chunk still over limit at minimum budget");
            }
            return chunks;
        }
        budget = (budget / 2).max(MIN_CHUNK);
    }
}
