use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument};

use parley_core::config::HistoryConfig;
use parley_core::ConversationEntry;

use crate::policy::{policy_for, SizePolicy};
use crate::window::ConversationWindow;

/// A window plus the number of resets already applied to it.
#[derive(Debug, Default)]
struct Tracked {
    window: ConversationWindow,
    applied_resets: u64,
}

impl Tracked {
    /// Apply resets requested while the window was locked elsewhere.
    fn catch_up(&mut self, resets: u64) {
        if self.applied_resets != resets {
            let dropped = self.window.len();
            self.window.clear();
            self.applied_resets = resets;
            debug!(dropped, "conversation window cleared");
        }
    }
}

/// One identity's window. `resets` lives outside the lock so a reset can be
/// requested without waiting for the current holder.
#[derive(Debug, Default)]
struct Slot {
    window: Arc<Mutex<Tracked>>,
    resets: AtomicU64,
}

impl Slot {
    fn resets(&self) -> u64 {
        self.resets.load(Ordering::Acquire)
    }
}

/// Identity → conversation window map.
///
/// The map itself is a `DashMap`, so lookups from unrelated identities never
/// contend on a global lock. Each window sits behind its own async mutex:
/// all access to one identity is serialized, and a caller can hold the window
/// for a whole reply with [`acquire`](Self::acquire).
pub struct ConversationStore {
    windows: DashMap<String, Arc<Slot>>,
    max_size: usize,
    policy: Arc<dyn SizePolicy>,
}

impl ConversationStore {
    pub fn new(max_size: usize, policy: impl SizePolicy + 'static) -> Self {
        Self::with_policy(max_size, Arc::new(policy))
    }

    pub fn with_policy(max_size: usize, policy: Arc<dyn SizePolicy>) -> Self {
        Self {
            windows: DashMap::new(),
            max_size,
            policy,
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::with_policy(config.max_size, policy_for(config.unit))
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Append an entry to the identity's window, creating the window on first
    /// contact, then trim the oldest entries back under the cap.
    #[instrument(skip(self, entry), fields(identity = %identity, role = %entry.role))]
    pub async fn append(&self, identity: &str, entry: ConversationEntry) {
        let mut guard = self.acquire(identity).await;
        guard.append(entry);
    }

    /// Read-only snapshot of the identity's history, oldest first.
    ///
    /// Returns an empty list for identities never seen; no window is created.
    #[instrument(skip(self), fields(identity = %identity))]
    pub async fn get_context(&self, identity: &str) -> Vec<ConversationEntry> {
        let Some(slot) = self.existing(identity) else {
            return Vec::new();
        };
        let mut tracked = slot.window.lock().await;
        tracked.catch_up(slot.resets());
        tracked.window.snapshot()
    }

    /// Discard the identity's history. No-op for unknown identities.
    ///
    /// Never waits. If the window is held, the reset takes effect for the
    /// next holder, including callers already queued on it, and the current
    /// holder's later appends are discarded with the rest of the history.
    #[instrument(skip(self), fields(identity = %identity))]
    pub async fn clear(&self, identity: &str) {
        if let Some(slot) = self.existing(identity) {
            let resets = slot.resets.fetch_add(1, Ordering::AcqRel) + 1;
            match slot.window.try_lock() {
                Ok(mut tracked) => tracked.catch_up(resets),
                Err(_) => debug!("window busy, reset deferred to next holder"),
            }
        }
        // Free the slot unless another task still holds a handle to it.
        self.windows
            .remove_if(identity, |_, slot| Arc::strong_count(slot) == 1);
    }

    /// Exclusive access to the identity's window, waiting for any other holder.
    pub async fn acquire(&self, identity: &str) -> WindowGuard {
        let slot = self.slot(identity);
        let guard = Arc::clone(&slot.window).lock_owned().await;
        self.guard(identity, slot, guard)
    }

    /// Exclusive access without waiting; `None` if the window is busy.
    pub fn try_acquire(&self, identity: &str) -> Option<WindowGuard> {
        let slot = self.slot(identity);
        let guard = Arc::clone(&slot.window).try_lock_owned().ok()?;
        Some(self.guard(identity, slot, guard))
    }

    /// Number of identities with a live window.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn guard(
        &self,
        identity: &str,
        slot: Arc<Slot>,
        mut guard: OwnedMutexGuard<Tracked>,
    ) -> WindowGuard {
        let epoch = slot.resets();
        guard.catch_up(epoch);
        WindowGuard {
            identity: identity.to_string(),
            slot,
            guard,
            epoch,
            max_size: self.max_size,
            policy: Arc::clone(&self.policy),
        }
    }

    fn slot(&self, identity: &str) -> Arc<Slot> {
        // Clone the Arc out so the shard lock is released before any await.
        Arc::clone(self.windows.entry(identity.to_string()).or_default().value())
    }

    fn existing(&self, identity: &str) -> Option<Arc<Slot>> {
        self.windows.get(identity).map(|w| Arc::clone(w.value()))
    }
}

/// Exclusive handle to one identity's window.
///
/// Dropping the guard releases the window to the next waiter.
pub struct WindowGuard {
    identity: String,
    slot: Arc<Slot>,
    guard: OwnedMutexGuard<Tracked>,
    /// Reset count when the guard was taken.
    epoch: u64,
    max_size: usize,
    policy: Arc<dyn SizePolicy>,
}

impl WindowGuard {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn context(&self) -> Vec<ConversationEntry> {
        self.guard.window.snapshot()
    }

    /// Append-then-trim; returns the number of evicted entries.
    ///
    /// Once the identity has been reset during this hold, the entry belongs
    /// to the discarded history and is dropped.
    pub fn append(&mut self, entry: ConversationEntry) -> usize {
        let resets = self.slot.resets();
        if resets != self.epoch {
            self.guard.catch_up(resets);
            debug!(
                identity = %self.identity,
                role = %entry.role,
                "window reset while held, entry dropped"
            );
            return 0;
        }

        let evicted = self
            .guard
            .window
            .append(entry, self.max_size, self.policy.as_ref());
        if evicted > 0 {
            debug!(
                identity = %self.identity,
                evicted,
                total = self.guard.window.total_size(),
                "conversation window trimmed"
            );
        }
        evicted
    }

    pub fn total_size(&self) -> usize {
        self.guard.window.total_size()
    }

    pub fn len(&self) -> usize {
        self.guard.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.window.is_empty()
    }
}
