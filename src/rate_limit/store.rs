//! Client Registry
//!
//! In-memory map from client key to that client's bucket and last-seen time.
//! A single mutex serializes bucket arithmetic, insertion and eviction.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::bucket::TokenBucket;

/// Opaque caller identity (usually an IP address)
pub type ClientKey = String;

/// Registry entry for one client
#[derive(Debug, Clone)]
pub struct Visitor {
    /// Token bucket for this client
    pub bucket: TokenBucket,

    /// Last time this client asked for admission (allowed or denied)
    pub last_seen: Instant,
}

/// Registry of per-client buckets
#[derive(Debug, Default)]
pub struct ClientRegistry {
    visitors: Mutex<HashMap<ClientKey, Visitor>>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the map; a panic in another holder leaves only plain numbers
    /// behind, so the poisoned state is still usable
    fn lock(&self) -> MutexGuard<'_, HashMap<ClientKey, Visitor>> {
        self.visitors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the client's entry, creating it with `make_bucket` first if
    /// the key is unseen. `now` is read while the lock is held.
    pub fn with_visitor<R>(
        &self,
        key: &str,
        now: impl FnOnce() -> Instant,
        make_bucket: impl FnOnce(Instant) -> TokenBucket,
        f: impl FnOnce(&mut Visitor, Instant) -> R,
    ) -> R {
        let mut visitors = self.lock();
        let now = now();

        if let Some(visitor) = visitors.get_mut(key) {
            return f(visitor, now);
        }

        let visitor = visitors.entry(key.to_owned()).or_insert_with(|| Visitor {
            bucket: make_bucket(now),
            last_seen: now,
        });
        f(visitor, now)
    }

    /// Remove every entry idle for longer than `stale_after`
    ///
    /// The cutoff is evaluated against each entry's `last_seen` under the
    /// same lock that `with_visitor` takes, so an entry touched concurrently
    /// is never removed on a stale reading. Returns the number evicted.
    pub fn evict_idle(&self, now: impl FnOnce() -> Instant, stale_after: Duration) -> usize {
        let mut visitors = self.lock();
        let now = now();
        let before = visitors.len();

        visitors.retain(|_, visitor| now.saturating_duration_since(visitor.last_seen) <= stale_after);

        before - visitors.len()
    }

    /// Whether a client currently has an entry
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
