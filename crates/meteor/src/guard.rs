//! Spawn deduplication guard.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use skyfall_core::CoordinateKey;

use crate::error::RegisterError;

/// Set of coordinate keys whose registration is in flight.
///
/// Cloning shares the same underlying set.
#[derive(Debug, Clone, Default)]
pub struct DedupGuard {
    held: Arc<Mutex<BTreeSet<CoordinateKey>>>,
}

impl DedupGuard {
    /// Guard with nothing held.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<CoordinateKey>> {
        // A poisoned set is still a valid set of keys.
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `key`, failing if another caller currently holds it.
    pub fn try_claim(&self, key: CoordinateKey) -> Result<Claim, RegisterError> {
        let mut held = self.lock();
        if !held.insert(key.clone()) {
            return Err(RegisterError::Duplicate(key));
        }
        Ok(Claim {
            key,
            guard: self.clone(),
        })
    }

    /// Whether `key` is currently claimed.
    pub fn is_held(&self, key: &CoordinateKey) -> bool {
        self.lock().contains(key)
    }

    /// Number of held claims.
    pub fn held_count(&self) -> usize {
        self.lock().len()
    }
}

/// Exclusive hold on a coordinate key, released on drop.
#[derive(Debug)]
pub struct Claim {
    key: CoordinateKey,
    guard: DedupGuard,
}

impl Claim {
    /// Claimed coordinate.
    pub fn key(&self) -> &CoordinateKey {
        &self.key
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.guard.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfall_core::BlockPos;

    fn key() -> CoordinateKey {
        CoordinateKey::new("W", BlockPos::new(10, 64, 10))
    }

    #[test]
    fn second_claim_fails_while_first_is_held() {
        let guard = DedupGuard::new();
        let claim = guard.try_claim(key()).unwrap();
        assert_eq!(
            guard.try_claim(key()).unwrap_err(),
            RegisterError::Duplicate(key())
        );
        drop(claim);
        assert!(guard.try_claim(key()).is_ok());
    }

    #[test]
    fn claims_release_on_drop() {
        let guard = DedupGuard::new();
        {
            let _claim = guard.try_claim(key()).unwrap();
            assert!(guard.is_held(&key()));
        }
        assert_eq!(guard.held_count(), 0);
    }

    #[test]
    fn different_keys_do_not_conflict() {
        let guard = DedupGuard::new();
        let _a = guard.try_claim(key()).unwrap();
        let _b = guard
            .try_claim(CoordinateKey::new("W", BlockPos::new(10, 65, 10)))
            .unwrap();
        assert_eq!(guard.held_count(), 2);
    }
}
