//! Host context for the Telegram adapter.
//!
//! `TelegramAppContext` is an alias for the shared pipeline's
//! `MessageContext`; `BotContext` is a ready-made implementation for hosts
//! that need nothing beyond a store, a generator and a reply registry.

use std::sync::Arc;

use parley_agent::{ActiveReplies, ReplyGenerator};
use parley_core::config::RenderConfig;
use parley_core::ParleyConfig;
use parley_memory::ConversationStore;

pub use parley_agent::pipeline::MessageContext as TelegramAppContext;

pub struct BotContext {
    store: ConversationStore,
    generator: Arc<dyn ReplyGenerator>,
    render: RenderConfig,
    active: ActiveReplies,
}

impl BotContext {
    pub fn new(config: &ParleyConfig, generator: Arc<dyn ReplyGenerator>) -> Self {
        Self {
            store: ConversationStore::from_config(&config.history),
            generator,
            render: config.render.clone(),
            active: ActiveReplies::new(),
        }
    }
}

impl TelegramAppContext for BotContext {
    fn store(&self) -> &ConversationStore {
        &self.store
    }

    fn generator(&self) -> &dyn ReplyGenerator {
        self.generator.as_ref()
    }

    fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    fn active(&self) -> &ActiveReplies {
        &self.active
    }
}
