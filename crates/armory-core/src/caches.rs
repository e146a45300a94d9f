//! Stale-marking registry for downstream data caches.
//!
//! The auth core does not own character or profile data; it only marks
//! those caches stale so their consumers refetch. Invalidation is a
//! synchronous generation bump, which lets the callback reconciler order
//! "invalidate, then sync, then navigate" structurally.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Downstream caches the auth core may invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Characters,
    UserProfile,
    BattleNetLinkStatus,
    Session,
}

impl CacheKey {
    /// Stable identifier, matching the query keys consumers subscribe to.
    pub fn id(&self) -> &'static str {
        match self {
            CacheKey::Characters => "characters",
            CacheKey::UserProfile => "userProfile",
            CacheKey::BattleNetLinkStatus => "battleNetLinkStatus",
            CacheKey::Session => "session",
        }
    }
}

/// Generation counters per cache key. Consumers compare generations to
/// detect staleness; the counter only ever moves forward.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    generations: Mutex<HashMap<CacheKey, u64>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one cache stale. Completes before returning.
    pub fn invalidate(&self, key: CacheKey) {
        let mut generations = self.lock_generations();
        let counter = generations.entry(key).or_insert(0);
        *counter += 1;
        debug!(cache = key.id(), generation = *counter, "cache invalidated");
    }

    /// Current generation for a key (0 = never invalidated).
    pub fn generation(&self, key: CacheKey) -> u64 {
        self.lock_generations().get(&key).copied().unwrap_or(0)
    }

    fn lock_generations(&self) -> MutexGuard<'_, HashMap<CacheKey, u64>> {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: invalidation bumps the generation for that key only.
    #[test]
    fn test_invalidate_bumps_generation() {
        let registry = CacheRegistry::new();
        assert_eq!(registry.generation(CacheKey::Characters), 0);

        registry.invalidate(CacheKey::Characters);
        registry.invalidate(CacheKey::Characters);
        assert_eq!(registry.generation(CacheKey::Characters), 2);
        assert_eq!(registry.generation(CacheKey::UserProfile), 0);
    }

    /// Test: key identifiers are stable.
    #[test]
    fn test_key_ids() {
        assert_eq!(CacheKey::Characters.id(), "characters");
        assert_eq!(CacheKey::UserProfile.id(), "userProfile");
        assert_eq!(CacheKey::BattleNetLinkStatus.id(), "battleNetLinkStatus");
        assert_eq!(CacheKey::Session.id(), "session");
    }
}
