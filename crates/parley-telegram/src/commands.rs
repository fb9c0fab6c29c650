//! Bot commands: `/reset` and `/stop`.

use teloxide::utils::command::BotCommands;
use tracing::info;

use crate::context::TelegramAppContext;

pub const RESET_REPLY: &str = "🤖 Chat history has been reset.";
pub const STOPPED_REPLY: &str = "🤖 Reply stopped.";
pub const NOTHING_TO_STOP_REPLY: &str = "🤖 Nothing to stop.";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "clear the chat history")]
    Reset,
    #[command(description = "stop the current reply")]
    Stop,
}

/// Run `cmd` for `identity` and return the text to send back.
///
/// `/reset` stops any reply still being generated and wipes the window
/// without waiting for it. The cut-short turn is discarded, and messages
/// already queued for the window start from the empty history.
pub async fn execute<C: TelegramAppContext + ?Sized>(
    cmd: &Command,
    ctx: &C,
    identity: &str,
) -> String {
    match cmd {
        Command::Reset => {
            ctx.active().cancel(identity);
            ctx.store().clear(identity).await;
            info!(identity = %identity, "chat history reset");
            RESET_REPLY.to_string()
        }
        Command::Stop => {
            if ctx.active().cancel(identity) {
                STOPPED_REPLY.to_string()
            } else {
                NOTHING_TO_STOP_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use parley_agent::{GenerateError, GenerateRequest, ReplyGenerator, StreamEvent};
    use parley_core::{ConversationEntry, ParleyConfig};

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
        ) -> Result<(), GenerateError> {
            Ok(())
        }
    }

    fn ctx() -> BotContext {
        BotContext::new(&ParleyConfig::default(), Arc::new(Silent))
    }

    #[test]
    fn parses_plain_and_addressed_commands() {
        assert!(matches!(
            Command::parse("/reset", "parley_bot"),
            Ok(Command::Reset)
        ));
        assert!(matches!(
            Command::parse("/stop@parley_bot", "parley_bot"),
            Ok(Command::Stop)
        ));
    }

    #[test]
    fn rejects_commands_for_other_bots_and_unknown_names() {
        assert!(Command::parse("/reset@other_bot", "parley_bot").is_err());
        assert!(Command::parse("/frobnicate", "parley_bot").is_err());
    }

    #[test]
    fn command_list_describes_reset() {
        let commands = Command::bot_commands();
        let reset = commands
            .iter()
            .find(|c| c.command.ends_with("reset"))
            .expect("reset listed");
        assert_eq!(reset.description, "clear the chat history");
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let ctx = ctx();
        ctx.store()
            .append("telegram-1", ConversationEntry::user("hi"))
            .await;
        ctx.store()
            .append("telegram-2", ConversationEntry::user("other"))
            .await;

        let reply = execute(&Command::Reset, &ctx, "telegram-1").await;

        assert_eq!(reply, "🤖 Chat history has been reset.");
        assert!(ctx.store().get_context("telegram-1").await.is_empty());
        assert_eq!(ctx.store().get_context("telegram-2").await.len(), 1);
    }

    #[tokio::test]
    async fn reset_does_not_wait_for_running_reply() {
        let ctx = ctx();
        ctx.store()
            .append("telegram-1", ConversationEntry::user("old"))
            .await;
        let active = ctx.active().register("telegram-1");
        let mut window = ctx.store().acquire("telegram-1").await;

        let reply = tokio::time::timeout(
            Duration::from_millis(100),
            execute(&Command::Reset, &ctx, "telegram-1"),
        )
        .await
        .expect("reset must not wait for the window");
        assert_eq!(reply, RESET_REPLY);
        assert!(active.token().is_cancelled());

        // The cancelled reply persists its turn after the reset.
        window.append(ConversationEntry::user("question"));
        window.append(ConversationEntry::assistant("partial").into_partial());
        drop(window);

        assert!(ctx.store().get_context("telegram-1").await.is_empty());
    }

    #[tokio::test]
    async fn stop_cancels_in_flight_reply() {
        let ctx = ctx();
        let active = ctx.active().register("telegram-1");

        let reply = execute(&Command::Stop, &ctx, "telegram-1").await;

        assert_eq!(reply, STOPPED_REPLY);
        assert!(active.token().is_cancelled());
    }

    #[tokio::test]
    async fn stop_without_reply_says_so() {
        let ctx = ctx();
        let reply = execute(&Command::Stop, &ctx, "telegram-1").await;
        assert_eq!(reply, NOTHING_TO_STOP_REPLY);
    }
}
