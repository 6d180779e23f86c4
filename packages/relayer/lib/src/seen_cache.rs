//! A bounded memory of the bridge endpoints an engine has already relayed from.

use alloy::primitives::B256;
use indexmap::IndexSet;

/// The default number of endpoints an engine remembers.
pub const DEFAULT_SEEN_CACHE_CAPACITY: usize = 1024;

/// Remembers bridge endpoints that have already been relayed from.
///
/// Seeing an endpoint again means the bridge has not moved since the last submission, so the
/// sync loop can skip the iteration without touching the source chain. Losing entries only
/// costs an extra iteration, never correctness, so the cache is bounded and drops the oldest
/// endpoint once full.
#[derive(Debug, Clone)]
pub struct SeenCache {
    entries: IndexSet<B256>,
    capacity: usize,
}

impl SeenCache {
    /// Creates a cache holding at most `capacity` endpoints (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: IndexSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns true if the endpoint was recorded and not yet evicted.
    #[must_use]
    pub fn contains(&self, endpoint: &B256) -> bool {
        self.entries.contains(endpoint)
    }

    /// Records an endpoint.
    ///
    /// Returns false if it was already recorded, in which case its age is left untouched.
    pub fn insert(&mut self, endpoint: B256) -> bool {
        if self.entries.contains(&endpoint) {
            return false;
        }

        if self.entries.len() == self.capacity {
            tracing::debug!(capacity = self.capacity, "evicting oldest seen endpoint");
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(endpoint)
    }

    /// The number of recorded endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The maximum number of recorded endpoints.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SeenCache {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_CACHE_CAPACITY)
    }
}
