/// Events emitted by a [`ReplyGenerator`](crate::provider::ReplyGenerator)
/// while a reply is being produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text content from the model.
    TextDelta { text: String },

    /// Stream completed successfully.
    Done { model: String },

    /// Error during streaming. No further events follow.
    Error { message: String },
}
