//! One-shot replies (command answers, error notices).
//!
//! Streaming replies go through the incremental renderer instead; this path
//! sends fixed text that must render literally.

use std::time::Duration;

use tracing::warn;

use parley_channels::{Delivery, Rendered};
use parley_markup::split_chunks_smart;

use crate::delivery::TelegramDelivery;

/// Telegram's limit is 4096; 4090 leaves room for the fallback path.
const CHUNK_MAX: usize = 4090;

/// Split `text` and escape each piece so that every escaped chunk fits.
///
/// Escaping can at most double a chunk, so raw pieces are cut at half the
/// limit.
pub(crate) fn literal_chunks(text: &str) -> Vec<Rendered> {
    split_chunks_smart(text, CHUNK_MAX / 2)
        .iter()
        .map(|chunk| Rendered::literal(chunk))
        .collect()
}

/// Send `text` verbatim, chunked, with a 100ms gap between chunks.
pub async fn send_response(delivery: &TelegramDelivery, text: &str) {
    let chunks = literal_chunks(text);
    for (i, chunk) in chunks.iter().enumerate() {
        if let Err(e) = delivery.send(chunk).await {
            warn!(
                chat_id = delivery.chat_id().0,
                error = %e,
                chunk_index = i,
                "Telegram: failed to send reply chunk"
            );
        }

        if i + 1 < chunks.len() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
