use parley_core::config::RenderConfig;
use parley_memory::ConversationStore;

use crate::active::ActiveReplies;
use crate::provider::ReplyGenerator;

/// Minimal context interface required by the streaming pipeline.
///
/// Implemented by each channel host (e.g. the Telegram adapter's app
/// context) so the pipeline stays channel-agnostic.
pub trait MessageContext: Send + Sync {
    fn store(&self) -> &ConversationStore;
    fn generator(&self) -> &dyn ReplyGenerator;
    fn render_config(&self) -> &RenderConfig;
    fn active(&self) -> &ActiveReplies;
}
