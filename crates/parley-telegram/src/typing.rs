//! "typing…" chat action, refreshed while a reply is produced.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatAction;

/// Telegram clears the action after about five seconds.
const REFRESH: Duration = Duration::from_secs(4);

/// Background typing indicator. Stops when dropped.
pub struct TypingIndicator(tokio::task::JoinHandle<()>);

impl TypingIndicator {
    pub fn start(bot: Bot, chat_id: ChatId) -> Self {
        let task = tokio::spawn(async move {
            loop {
                let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
                tokio::time::sleep(REFRESH).await;
            }
        });
        Self(task)
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.0.abort();
    }
}
