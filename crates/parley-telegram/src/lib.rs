pub mod adapter;
pub mod allow;
pub mod attach;
pub mod commands;
pub mod context;
pub mod delivery;
pub mod error;
pub mod handler;
pub mod send;
pub mod typing;

pub use adapter::TelegramAdapter;
pub use commands::Command;
pub use context::{BotContext, TelegramAppContext};
pub use delivery::TelegramDelivery;
pub use error::TelegramError;
pub use handler::BotName;
