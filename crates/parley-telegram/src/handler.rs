//! Telegram message handler registered in the teloxide Dispatcher.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use parley_agent::{process_message_streaming, PipelineOutcome};
use parley_core::config::TelegramConfig;
use parley_core::{ContentPart, EntryContent, Identity};

use crate::allow;
use crate::attach;
use crate::commands::{self, Command};
use crate::context::TelegramAppContext;
use crate::delivery::TelegramDelivery;
use crate::send;
use crate::typing::TypingIndicator;

/// The bot's own username, resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct BotName(pub String);

/// Main message handler registered in the teloxide Dispatcher.
///
/// Runs for every incoming `Message`. Performs:
/// 1. Bot-message filter
/// 2. Allowlist check (deny-by-default)
/// 3. DM guard
/// 4. Command interception
/// 5. Reply-to-photo download
/// 6. Non-blocking streaming pipeline invocation
pub async fn handle_message<C: TelegramAppContext + 'static>(
    bot: Bot,
    msg: Message,
    ctx: Arc<C>,
    config: TelegramConfig,
    bot_name: BotName,
) -> ResponseResult<()> {
    // 1. Ignore messages from other bots and from channels.
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    if from.is_bot {
        return Ok(());
    }

    // 2. Allowlist check (deny-by-default).
    if !allow::is_allowed(&config.allow_users, from.username.as_deref(), from.id.0) {
        debug!(user_id = from.id.0, "Telegram: sender not in allowlist");
        return Ok(());
    }

    // 3. DM guard.
    if msg.chat.is_private() && !config.dm_allowed {
        return Ok(());
    }

    let identity = Identity::telegram(from.id.0);
    let chat_id = msg.chat.id;
    let raw = msg.text().or(msg.caption()).unwrap_or("");
    let text = strip_bot_mention(raw, &bot_name.0).to_string();

    // 4. Commands answer inline so they stay ordered with later messages.
    if text.starts_with('/') {
        match Command::parse(&text, &bot_name.0) {
            Ok(cmd) => {
                let response = commands::execute(&cmd, ctx.as_ref(), identity.as_str()).await;
                send::send_response(&TelegramDelivery::new(bot, chat_id), &response).await;
            }
            Err(e) => debug!(error = %e, "Telegram: ignoring unrecognised command"),
        }
        return Ok(());
    }

    // 5. A replied-to photo travels with the text.
    let image_url = attach::replied_photo(&bot, &msg, config.max_attachment_bytes).await;
    let Some(input) = build_input(&text, image_url) else {
        return Ok(());
    };

    // 6. Spawn the pipeline so the dispatcher keeps serving the chat.
    tokio::spawn(async move {
        let typing = TypingIndicator::start(bot.clone(), chat_id);
        let delivery = TelegramDelivery::new(bot, chat_id);

        let result =
            process_message_streaming(ctx.as_ref(), &delivery, identity.as_str(), input).await;
        drop(typing);

        match result {
            Ok(PipelineOutcome::Completed { reply, model }) => {
                info!(identity = %identity, model = %model, len = reply.len(), "Telegram: reply delivered");
            }
            Ok(PipelineOutcome::Failed { partial, reason }) => {
                warn!(identity = %identity, reason = %reason, partial_len = partial.len(), "Telegram: reply failed");
            }
            Ok(PipelineOutcome::Cancelled { partial }) => {
                info!(identity = %identity, partial_len = partial.len(), "Telegram: reply cancelled");
            }
            Err(e) => {
                warn!(error = %e, identity = %identity, "Telegram: streaming pipeline failed");
                send::send_response(&delivery, &format!("🤖 An error has occurred: {e}")).await;
            }
        }
    });

    Ok(())
}

/// Drop a leading `@bot_username` (as group clients insert it) and the
/// whitespace after it.
fn strip_bot_mention<'a>(text: &'a str, bot_username: &str) -> &'a str {
    if bot_username.is_empty() {
        return text;
    }
    let mention_len = bot_username.len() + 1;
    match text.get(..mention_len) {
        Some(head)
            if head.starts_with('@') && head[1..].eq_ignore_ascii_case(bot_username) =>
        {
            text[mention_len..].trim_start()
        }
        _ => text,
    }
}

/// Message body for the generator: plain text, or text plus an image part.
///
/// `None` when there is nothing to answer.
fn build_input(text: &str, image_url: Option<String>) -> Option<EntryContent> {
    match image_url {
        None if text.trim().is_empty() => None,
        None => Some(EntryContent::Text(text.to_string())),
        Some(image_url) => {
            let mut parts = Vec::with_capacity(2);
            if !text.trim().is_empty() {
                parts.push(ContentPart::Text {
                    text: text.to_string(),
                });
            }
            parts.push(ContentPart::ImageUrl { image_url });
            Some(EntryContent::Parts(parts))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_mention() {
        assert_eq!(strip_bot_mention("@parley_bot  hello", "parley_bot"), "hello");
        assert_eq!(strip_bot_mention("@Parley_Bot /reset", "parley_bot"), "/reset");
    }

    #[test]
    fn keeps_text_without_leading_mention() {
        assert_eq!(strip_bot_mention("hi @parley_bot", "parley_bot"), "hi @parley_bot");
        assert_eq!(strip_bot_mention("@parley", "parley_bot"), "@parley");
        assert_eq!(strip_bot_mention("héllo wörld", "bot"), "héllo wörld");
        assert_eq!(strip_bot_mention("@x", ""), "@x");
    }

    #[test]
    fn text_only_input() {
        assert_eq!(
            build_input("hello", None),
            Some(EntryContent::Text("hello".into()))
        );
        assert_eq!(build_input("   ", None), None);
    }

    #[test]
    fn photo_reply_puts_text_first() {
        let input = build_input("what is this?", Some("data:image/jpeg;base64,AA==".into()));
        assert_eq!(
            input,
            Some(EntryContent::Parts(vec![
                ContentPart::Text {
                    text: "what is this?".into()
                },
                ContentPart::ImageUrl {
                    image_url: "data:image/jpeg;base64,AA==".into()
                },
            ]))
        );
    }

    #[test]
    fn photo_reply_without_text_is_image_only() {
        let input = build_input("", Some("data:image/jpeg;base64,AA==".into())).unwrap();
        assert_eq!(input.image_count(), 1);
        assert_eq!(input.text(), "");
    }
}
