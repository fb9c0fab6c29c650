//! Cost functions used to size a conversation window.

use std::sync::Arc;

use parley_core::config::HistoryUnit;
use parley_core::ConversationEntry;

/// Fixed token charge for an image part (low-detail image in OpenAI pricing).
pub const IMAGE_TOKEN_COST: usize = 85;

/// Measures how much of the history budget one entry consumes.
///
/// Any `Fn(&ConversationEntry) -> usize` closure is a policy as well.
pub trait SizePolicy: Send + Sync {
    fn cost(&self, entry: &ConversationEntry) -> usize;
}

impl<F> SizePolicy for F
where
    F: Fn(&ConversationEntry) -> usize + Send + Sync,
{
    fn cost(&self, entry: &ConversationEntry) -> usize {
        self(entry)
    }
}

/// Every entry costs 1, so the cap is a maximum number of turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryCount;

impl SizePolicy for EntryCount {
    fn cost(&self, _entry: &ConversationEntry) -> usize {
        1
    }
}

/// Unicode scalar values of the entry's text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharCount;

impl SizePolicy for CharCount {
    fn cost(&self, entry: &ConversationEntry) -> usize {
        entry.content.text().chars().count()
    }
}

/// Rough token estimate: one token per four characters, rounded up,
/// plus a flat charge per image.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEstimate;

impl SizePolicy for TokenEstimate {
    fn cost(&self, entry: &ConversationEntry) -> usize {
        let chars = entry.content.text().chars().count();
        chars.div_ceil(4) + entry.content.image_count() * IMAGE_TOKEN_COST
    }
}

/// Policy matching a configured history unit.
pub fn policy_for(unit: HistoryUnit) -> Arc<dyn SizePolicy> {
    match unit {
        HistoryUnit::Tokens => Arc::new(TokenEstimate),
        HistoryUnit::Chars => Arc::new(CharCount),
        HistoryUnit::Entries => Arc::new(EntryCount),
    }
}
