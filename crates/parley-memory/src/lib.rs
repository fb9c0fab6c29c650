//! Bounded, per-identity conversation history used as reply context.
//!
//! Lives for the lifetime of the process only; nothing is persisted.

pub mod policy;
pub mod store;
pub mod window;

pub use policy::{policy_for, CharCount, EntryCount, SizePolicy, TokenEstimate};
pub use store::{ConversationStore, WindowGuard};
pub use window::ConversationWindow;
