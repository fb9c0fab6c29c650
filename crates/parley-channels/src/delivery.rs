use async_trait::async_trait;

use parley_markup::{escape_markdown_v2, transcode};

use crate::error::DeliveryError;

/// Content of one outbound message in both forms.
///
/// `markup` is what the platform should render; `plain` is the raw text a
/// delivery falls back to when the platform rejects the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub markup: String,
    pub plain: String,
}

impl Rendered {
    pub fn new(markup: impl Into<String>, plain: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            plain: plain.into(),
        }
    }

    /// Transcode informal markdown.
    pub fn from_markdown(raw: &str) -> Self {
        Self::new(transcode(raw), raw)
    }

    /// Escape `text` so it renders literally.
    pub fn literal(text: &str) -> Self {
        Self::new(escape_markdown_v2(text), text)
    }
}

/// Outbound side of a chat platform: send a message, then edit it in place.
///
/// Implementations must be `Send + Sync` so one delivery can serve every
/// in-flight reply.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Platform reference to a sent message, used for later edits.
    type Handle: Clone + Send + Sync;

    /// Stable lowercase identifier (e.g. `"telegram"`).
    fn name(&self) -> &str;

    async fn send(&self, content: &Rendered) -> Result<Self::Handle, DeliveryError>;

    /// Replace the content of a previously sent message.
    ///
    /// Returns [`DeliveryError::NotModified`] when the platform reports the
    /// content unchanged, and [`DeliveryError::MessageGone`] when the message
    /// no longer exists.
    async fn edit(&self, handle: &Self::Handle, content: &Rendered) -> Result<(), DeliveryError>;
}
