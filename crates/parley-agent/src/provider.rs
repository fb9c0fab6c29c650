use async_trait::async_trait;
use tokio::sync::mpsc;

use parley_core::{ConversationEntry, EntryContent};

use crate::stream::StreamEvent;

/// Everything the generator gets for one reply.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Prior turns of the conversation, oldest first.
    pub context: Vec<ConversationEntry>,
    /// The new user message.
    pub input: EntryContent,
}

/// Backend producing a streamed reply (an LLM provider, a router over
/// several, a canned responder in tests).
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generator name for logging and error messages.
    fn name(&self) -> &str;

    /// Stream reply events through `tx`.
    ///
    /// Implementations send zero or more [`StreamEvent::TextDelta`] followed
    /// by `Done` or `Error`, then return. A send error means the consumer
    /// went away; stop generating.
    async fn generate(
        &self,
        req: &GenerateRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), GenerateError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("generator unavailable: {0}")]
    Unavailable(String),

    #[error("operation cancelled")]
    Cancelled,
}
