pub mod active;
pub mod aggregate;
pub mod pipeline;
pub mod provider;
pub mod stream;

pub use active::{ActiveReplies, ActiveReply};
pub use aggregate::{StreamAggregator, StreamError};
pub use pipeline::{process_message_streaming, MessageContext, PipelineError, PipelineOutcome};
pub use provider::{GenerateError, GenerateRequest, ReplyGenerator};
pub use stream::StreamEvent;
