//! Per-token lock registry.
//!
//! Every token gets its own mutual-exclusion lock, created on first
//! use. The registry's map is guarded by a single mutex held only for
//! lookup and insert; the returned per-token lock is then acquired and
//! released entirely outside the registry, so contention on one token
//! never touches another.
//!
//! The registry is softly bounded: once it holds `capacity` entries,
//! the next insert first drops entries that are both unreferenced and
//! idle past the quiet period. An entry whose lock is still referenced
//! elsewhere is never dropped, which keeps mutual exclusion intact for
//! in-flight operations. The bound is a ceiling on quiet growth, not a
//! hard cap.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::token::Token;

/// Default maximum number of quiet entries retained.
const DEFAULT_CAPACITY: usize = 1024;

/// Default idle period after which an unreferenced entry may be dropped.
const DEFAULT_IDLE_AFTER: Duration = Duration::from_secs(300);

struct LockEntry {
    lock: Arc<Mutex<()>>,
    last_used: Instant,
}

/// Lazily-populated map from token to its mutual-exclusion lock.
pub struct LockRegistry {
    entries: Mutex<HashMap<Token, LockEntry>>,
    capacity: usize,
    idle_after: Duration,
}

impl LockRegistry {
    /// Creates a registry with the default bounds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bounds(DEFAULT_CAPACITY, DEFAULT_IDLE_AFTER)
    }

    /// Creates a registry that starts evicting idle entries once
    /// `capacity` is reached. An entry is idle when its lock is
    /// unreferenced outside the registry and it was last used more
    /// than `idle_after` ago.
    #[must_use]
    pub fn with_bounds(capacity: usize, idle_after: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            idle_after,
        }
    }

    /// Returns the lock for `token`, creating it on first use.
    ///
    /// Callers clone the `Arc` out of the registry and lock it outside
    /// the registry mutex. Two callers with the same token always get
    /// the same lock while either still holds a reference to it.
    pub fn lock_for(&self, token: &Token) -> Arc<Mutex<()>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(token) {
            entry.last_used = now;
            return Arc::clone(&entry.lock);
        }

        if entries.len() >= self.capacity {
            Self::evict_idle(&mut entries, now, self.idle_after);
        }

        let lock = Arc::new(Mutex::new(()));
        entries.insert(
            token.clone(),
            LockEntry {
                lock: Arc::clone(&lock),
                last_used: now,
            },
        );
        lock
    }

    /// Returns the number of registered tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no token has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops entries that are unreferenced and idle. A strong count of
    /// one means only the registry holds the lock; since clones are
    /// handed out only under the registry mutex, that state cannot
    /// change while this runs.
    fn evict_idle(entries: &mut HashMap<Token, LockEntry>, now: Instant, idle_after: Duration) {
        entries.retain(|_, entry| {
            Arc::strong_count(&entry.lock) > 1 || now.duration_since(entry.last_used) < idle_after
        });
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
