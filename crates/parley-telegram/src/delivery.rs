//! `Delivery` over the Bot API: MarkdownV2 first, plain text when Telegram
//! rejects the entities.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use parley_channels::{Delivery, DeliveryError, Rendered};

/// Sends and edits messages in one chat.
#[derive(Clone)]
pub struct TelegramDelivery {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramDelivery {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

#[async_trait]
impl Delivery for TelegramDelivery {
    type Handle = MessageId;

    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, content: &Rendered) -> Result<MessageId, DeliveryError> {
        let sent = self
            .bot
            .send_message(self.chat_id, &content.markup)
            .parse_mode(ParseMode::MarkdownV2)
            .await;

        match sent {
            Ok(msg) => Ok(msg.id),
            Err(RequestError::Api(ApiError::CantParseEntities(reason))) => {
                debug!(chat_id = self.chat_id.0, error = %reason, "Telegram: MarkdownV2 rejected, sending plain text");
                self.bot
                    .send_message(self.chat_id, &content.plain)
                    .await
                    .map(|msg| msg.id)
                    .map_err(map_error)
            }
            Err(e) => Err(map_error(e)),
        }
    }

    async fn edit(&self, handle: &MessageId, content: &Rendered) -> Result<(), DeliveryError> {
        let edited = self
            .bot
            .edit_message_text(self.chat_id, *handle, &content.markup)
            .parse_mode(ParseMode::MarkdownV2)
            .await;

        match edited {
            Ok(_) => Ok(()),
            Err(RequestError::Api(ApiError::CantParseEntities(reason))) => {
                debug!(chat_id = self.chat_id.0, error = %reason, "Telegram: MarkdownV2 rejected, editing as plain text");
                self.bot
                    .edit_message_text(self.chat_id, *handle, &content.plain)
                    .await
                    .map(|_| ())
                    .map_err(map_error)
            }
            Err(e) => Err(map_error(e)),
        }
    }
}

/// Translate Bot API failures into the renderer's error vocabulary.
pub(crate) fn map_error(e: RequestError) -> DeliveryError {
    match e {
        RequestError::Api(ApiError::MessageNotModified) => DeliveryError::NotModified,
        RequestError::Api(ApiError::MessageToEditNotFound) => DeliveryError::MessageGone,
        RequestError::RetryAfter(after) => DeliveryError::RateLimited {
            retry_after: after.duration(),
        },
        RequestError::Api(api) => DeliveryError::Rejected(api.to_string()),
        other => DeliveryError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_modified_maps_to_conflict() {
        let mapped = map_error(RequestError::Api(ApiError::MessageNotModified));
        assert_eq!(mapped, DeliveryError::NotModified);
        assert!(mapped.is_render_conflict());
    }

    #[test]
    fn missing_message_maps_to_gone() {
        let mapped = map_error(RequestError::Api(ApiError::MessageToEditNotFound));
        assert_eq!(mapped, DeliveryError::MessageGone);
    }

    #[test]
    fn other_api_errors_are_rejections() {
        let mapped = map_error(RequestError::Api(ApiError::CantParseEntities(
            "can't find end of Bold entity".into(),
        )));
        assert!(matches!(mapped, DeliveryError::Rejected(_)));
        assert!(!mapped.is_render_conflict());
    }
}
