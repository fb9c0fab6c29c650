//! Replied-to photos, downloaded and inlined as `data:` URLs.
//!
//! A Bot API file URL embeds the bot token, so the bytes are fetched here
//! and handed to the generator base64-encoded instead.

use base64::Engine;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileMeta, PhotoSize};
use tracing::warn;

/// Telegram re-encodes every photo as JPEG.
const PHOTO_MIME: &str = "image/jpeg";

/// The highest-resolution size of a photo.
pub fn largest_photo(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes
        .iter()
        .max_by_key(|p| (u64::from(p.width) * u64::from(p.height), p.file.size))
}

/// Download the photo a message replies to.
///
/// Returns `None` when the replied-to message has no photo, or when the
/// download fails or exceeds `max_bytes`.
pub async fn replied_photo(bot: &Bot, msg: &Message, max_bytes: u64) -> Option<String> {
    let photos = msg.reply_to_message()?.photo()?;
    let photo = largest_photo(photos)?;
    download_photo(bot, &photo.file, max_bytes).await
}

async fn download_photo(bot: &Bot, meta: &FileMeta, max_bytes: u64) -> Option<String> {
    if u64::from(meta.size) > max_bytes {
        warn!(
            file_id = ?meta.id,
            size = meta.size,
            limit = max_bytes,
            "Telegram: photo exceeds size limit, skipping"
        );
        return None;
    }

    let file = match bot.get_file(meta.id.clone()).await {
        Ok(f) => f,
        Err(e) => {
            warn!(file_id = ?meta.id, error = %e, "Telegram: get_file failed");
            return None;
        }
    };

    let mut buf: Vec<u8> = Vec::new();
    if let Err(e) = bot.download_file(&file.path, &mut buf).await {
        warn!(file_id = ?meta.id, error = %e, "Telegram: download_file failed");
        return None;
    }

    Some(image_data_url(PHOTO_MIME, &buf))
}

/// `data:{mime};base64,{payload}`
pub fn image_data_url(mime: &str, bytes: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{b64}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_has_mime_and_payload() {
        let url = image_data_url("image/jpeg", b"hello");
        assert_eq!(url, "data:image/jpeg;base64,aGVsbG8=");
    }

    #[test]
    fn empty_payload_still_forms_a_url() {
        assert_eq!(image_data_url("image/png", &[]), "data:image/png;base64,");
    }
}
