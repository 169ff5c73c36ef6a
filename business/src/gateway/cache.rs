use std::any::Any;

use flock_states::{State, state_assign_impl};

/// Invalidation bookkeeping for one cached remote collection.
///
/// The counter makes concurrent settlements observable: two mutations that
/// both succeed bump it twice, whatever order they land in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheEntry {
    pub invalidations: u64,
    pub stale: bool,
}

impl CacheEntry {
    pub fn invalidate(&mut self) {
        self.invalidations += 1;
        self.stale = true;
    }

    pub fn mark_fresh(&mut self) {
        self.stale = false;
    }
}

/// Staleness markers for the remote collections the client caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCaches {
    pub users: CacheEntry,
    pub assets: CacheEntry,
}

impl State for CollectionCaches {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn snapshot(&self) -> Option<Box<dyn Any + Send>> {
        Some(Box::new(*self))
    }

    fn assign_box(&mut self, new_self: Box<dyn Any + Send>) {
        state_assign_impl(self, new_self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_counts_and_marks_stale() {
        let mut caches = CollectionCaches::default();
        assert!(!caches.assets.stale);

        caches.assets.invalidate();
        caches.assets.invalidate();
        assert_eq!(caches.assets.invalidations, 2);
        assert!(caches.assets.stale);
        // The other collection is untouched.
        assert_eq!(caches.users.invalidations, 0);

        caches.assets.mark_fresh();
        assert!(!caches.assets.stale);
        // Freshness does not rewind the counter.
        assert_eq!(caches.assets.invalidations, 2);
    }
}
