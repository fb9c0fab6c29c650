use std::time::Duration;

use thiserror::Error;

/// Errors reported by a [`Delivery`](crate::delivery::Delivery) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The edit would leave the message unchanged.
    #[error("message is not modified")]
    NotModified,

    /// The message to edit no longer exists (deleted by the user, chat gone).
    #[error("message to edit not found")]
    MessageGone,

    /// The platform asked us to back off.
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// The platform refused the content itself.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Network or API failure unrelated to the content.
    #[error("transport error: {0}")]
    Transport(String),
}

impl DeliveryError {
    /// No-op and vanished-message results: the renderer logs and ignores them.
    pub fn is_render_conflict(&self) -> bool {
        matches!(self, Self::NotModified | Self::MessageGone)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("renderer already finished")]
    Finished,

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
