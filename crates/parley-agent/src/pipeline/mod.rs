//! Shared streaming pipeline: channel-agnostic processing of one message.
//!
//! Channel adapters call `process_message_streaming` with their own
//! [`Delivery`](parley_channels::Delivery) and only add channel-specific
//! handling (commands, typing indicators) on top.

pub mod context;
pub mod process;

pub use context::MessageContext;
pub use process::{process_message_streaming, PipelineError, PipelineOutcome};
