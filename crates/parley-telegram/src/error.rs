/// Startup failures of the Telegram adapter. Per-message failures are logged,
/// never returned.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("no bot token configured (telegram.bot_token or PARLEY_TELEGRAM__BOT_TOKEN)")]
    NoToken,

    #[error("getMe failed: {0}")]
    Authenticate(#[source] teloxide::RequestError),

    #[error("bot account has no username")]
    NoUsername,
}

pub type Result<T> = std::result::Result<T, TelegramError>;
