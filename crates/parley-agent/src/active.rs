//! Registry of in-flight replies, so `/stop` can cancel them.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Identity → cancellation token of the reply currently being generated.
#[derive(Debug, Default)]
pub struct ActiveReplies {
    ops: DashMap<String, (u64, CancellationToken)>,
    next_id: AtomicU64,
}

impl ActiveReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reply for `identity`. The entry is removed when the
    /// returned guard drops.
    ///
    /// A reply already registered under the same identity is cancelled and
    /// replaced.
    pub fn register(&self, identity: &str) -> ActiveReply<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Some((_, (_, previous))) = self.ops.remove(identity) {
            previous.cancel();
        }
        self.ops
            .insert(identity.to_string(), (id, token.clone()));
        ActiveReply {
            registry: self,
            identity: identity.to_string(),
            id,
            token,
        }
    }

    /// Cancel the identity's in-flight reply. Returns false if there is none.
    pub fn cancel(&self, identity: &str) -> bool {
        match self.ops.get(identity) {
            Some(entry) => {
                entry.value().1.cancel();
                info!(identity = %identity, "reply cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight reply and return the affected identities.
    pub fn cancel_all(&self) -> Vec<String> {
        let mut cancelled: Vec<String> = self
            .ops
            .iter()
            .map(|entry| {
                entry.value().1.cancel();
                entry.key().clone()
            })
            .collect();
        cancelled.sort();
        if !cancelled.is_empty() {
            info!(count = cancelled.len(), "all replies cancelled");
        }
        cancelled
    }

    pub fn is_active(&self, identity: &str) -> bool {
        self.ops.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Registration of one in-flight reply.
pub struct ActiveReply<'a> {
    registry: &'a ActiveReplies,
    identity: String,
    id: u64,
    token: CancellationToken,
}

impl ActiveReply<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for ActiveReply<'_> {
    fn drop(&mut self) {
        // Leave a newer registration under the same identity alone.
        self.registry
            .ops
            .remove_if(&self.identity, |_, (id, _)| *id == self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_reaches_the_registered_token() {
        let active = ActiveReplies::new();
        let reply = active.register("u1");
        assert!(active.is_active("u1"));
        assert!(active.cancel("u1"));
        assert!(reply.token().is_cancelled());
    }

    #[test]
    fn cancel_unknown_identity_is_false() {
        let active = ActiveReplies::new();
        assert!(!active.cancel("nobody"));
    }

    #[test]
    fn guard_drop_deregisters() {
        let active = ActiveReplies::new();
        drop(active.register("u1"));
        assert!(active.is_empty());
    }

    #[test]
    fn newer_registration_survives_older_guard() {
        let active = ActiveReplies::new();
        let old = active.register("u1");
        let new = active.register("u1");
        assert!(old.token().is_cancelled());

        drop(old);
        assert!(active.is_active("u1"));
        assert!(!new.token().is_cancelled());
    }

    #[test]
    fn cancel_all_reports_identities() {
        let active = ActiveReplies::new();
        let a = active.register("b");
        let b = active.register("a");
        assert_eq!(active.cancel_all(), vec!["a", "b"]);
        assert!(a.token().is_cancelled() && b.token().is_cancelled());
    }
}
