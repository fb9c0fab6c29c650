//! Telegram channel adapter.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling event loop
//! until the process is interrupted.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use parley_core::config::TelegramConfig;

use crate::allow;
use crate::commands::Command;
use crate::context::TelegramAppContext;
use crate::error::{Result, TelegramError};
use crate::handler::{handle_message, BotName};

/// Telegram channel adapter. Long polling, so no public URL is required.
pub struct TelegramAdapter<C: TelegramAppContext + 'static> {
    ctx: Arc<C>,
    config: TelegramConfig,
}

impl<C: TelegramAppContext + 'static> TelegramAdapter<C> {
    pub fn new(config: &TelegramConfig, ctx: Arc<C>) -> Self {
        Self {
            ctx,
            config: config.clone(),
        }
    }

    /// Connect to Telegram and serve updates until Ctrl-C.
    ///
    /// Fails fast when no token is configured or the token is rejected by
    /// `getMe`; failures after startup are logged by the dispatcher.
    pub async fn run(self) -> Result<()> {
        if self.config.bot_token.trim().is_empty() {
            return Err(TelegramError::NoToken);
        }
        if allow::denies_everyone(&self.config.allow_users) {
            warn!(
                "Telegram: telegram.allow_users is empty, every sender will be ignored \
                 (add \"*\" to allow everyone)"
            );
        }
        let bot = Bot::new(&self.config.bot_token);

        let me = bot.get_me().await.map_err(TelegramError::Authenticate)?;
        let username = me.user.username.clone().ok_or(TelegramError::NoUsername)?;
        let bot_name = BotName(username);
        info!(bot = %bot_name.0, "Telegram: authenticated");

        if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
            warn!(error = %e, "Telegram: failed to register command list");
        }

        info!("Telegram: starting long-polling dispatcher");

        let ctx = Arc::clone(&self.ctx);
        let config = self.config.clone();
        let handler = Update::filter_message().endpoint(handle_message::<C>);

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![ctx, config, bot_name])
            .default_handler(|_upd| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        let cancelled = self.ctx.active().cancel_all();
        if !cancelled.is_empty() {
            info!(count = cancelled.len(), "Telegram: cancelled in-flight replies on shutdown");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use parley_agent::{GenerateError, GenerateRequest, ReplyGenerator, StreamEvent};
    use parley_core::ParleyConfig;

    use super::*;
    use crate::context::BotContext;

    struct Silent;

    #[async_trait]
    impl ReplyGenerator for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn generate(
            &self,
            _req: &GenerateRequest,
            _tx: mpsc::Sender<StreamEvent>,
        ) -> std::result::Result<(), GenerateError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn run_without_token_fails_fast() {
        let config = ParleyConfig::default();
        let ctx = Arc::new(BotContext::new(&config, Arc::new(Silent)));
        let adapter = TelegramAdapter::new(&config.telegram, ctx);

        let err = adapter.run().await.unwrap_err();
        assert!(matches!(err, TelegramError::NoToken));
    }
}
