use std::collections::VecDeque;

use parley_core::ConversationEntry;

use crate::policy::SizePolicy;

/// Ordered history of one identity, oldest first.
///
/// Each entry's cost is computed once on append, so the running total stays
/// consistent even if a policy is not deterministic.
#[derive(Debug, Default)]
pub struct ConversationWindow {
    entries: VecDeque<(ConversationEntry, usize)>,
    total: usize,
}

impl ConversationWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry`, then evict from the oldest end until the window fits
    /// `max_size` again. The entry just appended is never evicted.
    ///
    /// Returns the number of evicted entries.
    pub fn append(
        &mut self,
        entry: ConversationEntry,
        max_size: usize,
        policy: &dyn SizePolicy,
    ) -> usize {
        let cost = policy.cost(&entry);
        self.entries.push_back((entry, cost));
        self.total += cost;

        let mut evicted = 0;
        while self.total > max_size && self.entries.len() > 1 {
            if let Some((_, old_cost)) = self.entries.pop_front() {
                self.total -= old_cost;
                evicted += 1;
            }
        }
        evicted
    }

    /// Clone of the retained entries in insertion order.
    pub fn snapshot(&self) -> Vec<ConversationEntry> {
        self.entries.iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cumulative cost of the retained entries.
    pub fn total_size(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CharCount, EntryCount};

    #[test]
    fn evicts_oldest_first() {
        let mut window = ConversationWindow::new();
        for text in ["one", "two", "three"] {
            window.append(ConversationEntry::user(text), 2, &EntryCount);
        }
        let texts: Vec<String> = window.snapshot().iter().map(|e| e.content.text()).collect();
        assert_eq!(texts, vec!["two", "three"]);
        assert_eq!(window.total_size(), 2);
    }

    #[test]
    fn oversized_entry_is_kept_alone() {
        let mut window = ConversationWindow::new();
        window.append(ConversationEntry::user("abc"), 5, &CharCount);
        let evicted = window.append(ConversationEntry::assistant("a much longer reply"), 5, &CharCount);
        assert_eq!(evicted, 1);
        assert_eq!(window.len(), 1);
        assert_eq!(window.snapshot()[0].content.text(), "a much longer reply");
    }

    #[test]
    fn never_exceeds_cap_with_multiple_entries() {
        let mut window = ConversationWindow::new();
        for i in 0..50 {
            window.append(ConversationEntry::user("x".repeat(i % 7 + 1)), 20, &CharCount);
            assert!(window.total_size() <= 20 || window.len() == 1);
        }
    }

    #[test]
    fn clear_resets_total() {
        let mut window = ConversationWindow::new();
        window.append(ConversationEntry::user("abc"), 100, &CharCount);
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.total_size(), 0);
    }
}
