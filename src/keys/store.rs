//! Signing key lifecycle: generation, rotation and pruning.
//!
//! The store always has a current key. Rotation generates a new pair,
//! makes it current and prunes pairs older than `max_age`, except the
//! current one. Pruning only runs on rotation.

use crate::error::TokenError;
use crate::keys::pair::{KeyPair, PublicKey};
use crate::metrics;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

struct KeyRing {
    keys: HashMap<String, Arc<KeyPair>>,
    current: Arc<KeyPair>,
}

impl KeyRing {
    /// Removes pairs created before `cutoff`, keeping the current pair.
    fn prune(&mut self, cutoff: DateTime<Utc>) -> usize {
        let current = Arc::clone(&self.current);
        let before = self.keys.len();
        self.keys
            .retain(|_, key| Arc::ptr_eq(key, &current) || key.created_at() >= cutoff);
        before - self.keys.len()
    }
}

/// Holds this process's signing identity.
///
/// All reads and rotations go through one read/write lock. Key generation
/// runs before the lock is taken; insert, promotion and pruning happen
/// together under the write lock.
pub struct KeyStore {
    ring: RwLock<KeyRing>,
    max_age: Duration,
}

impl KeyStore {
    /// Create a store holding one freshly generated key.
    ///
    /// A zero `max_age` disables pruning, so retired keys accumulate.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial key pair cannot be generated.
    pub fn new(max_age: Duration) -> Result<Self, TokenError> {
        let first = Arc::new(KeyPair::generate(Utc::now())?);
        info!(kid = %first.kid(), max_age_secs = max_age.as_secs(), "Key store initialized");

        let mut keys = HashMap::new();
        keys.insert(first.kid().to_string(), Arc::clone(&first));

        metrics::record_key_rotation();
        Ok(Self {
            ring: RwLock::new(KeyRing {
                keys,
                current: first,
            }),
            max_age,
        })
    }

    /// Generate a new signing key, make it current and prune expired keys.
    ///
    /// Returns the identifier of the new current key.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails; the store is unchanged.
    pub fn rotate(&self) -> Result<String, TokenError> {
        self.rotate_at(Utc::now())
    }

    /// Rotate as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails; the store is unchanged.
    pub fn rotate_at(&self, now: DateTime<Utc>) -> Result<String, TokenError> {
        let key = Arc::new(KeyPair::generate(now)?);
        let kid = key.kid().to_string();

        let (pruned, retained) = {
            let mut ring = self.ring.write();
            let previous = ring.current.kid().to_string();
            ring.keys.insert(kid.clone(), Arc::clone(&key));
            ring.current = key;

            let pruned = self.prune_locked(&mut ring, now);
            debug!(previous = %previous, "Previous signing key retired");
            (pruned, ring.keys.len())
        };

        metrics::record_key_rotation();
        metrics::record_keys_pruned(pruned);
        info!(kid = %kid, pruned, retained, "Signing key rotated");
        Ok(kid)
    }

    fn prune_locked(&self, ring: &mut KeyRing, now: DateTime<Utc>) -> usize {
        if self.max_age.is_zero() {
            return 0;
        }
        let Ok(max_age) = chrono::Duration::from_std(self.max_age) else {
            return 0;
        };
        match now.checked_sub_signed(max_age) {
            Some(cutoff) => ring.prune(cutoff),
            None => 0,
        }
    }

    /// The key new tokens are signed with.
    #[must_use]
    pub fn current(&self) -> Arc<KeyPair> {
        Arc::clone(&self.ring.read().current)
    }

    /// Public halves of every retained key, in no particular order.
    #[must_use]
    pub fn all_public(&self) -> Vec<PublicKey> {
        self.ring
            .read()
            .keys
            .values()
            .map(|key| key.public_key().clone())
            .collect()
    }

    /// Public key for `kid`, if it is still retained.
    #[must_use]
    pub fn public_key(&self, kid: &str) -> Option<PublicKey> {
        self.ring
            .read()
            .keys
            .get(kid)
            .map(|key| key.public_key().clone())
    }

    /// Number of retained keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.read().keys.len()
    }

    /// Always false: a constructed store holds at least its current key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.read().keys.is_empty()
    }

    /// Configured maximum key age; zero means keys are never pruned.
    #[must_use]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_store_has_current_key() {
        let store = KeyStore::new(Duration::ZERO).unwrap();
        let current = store.current();

        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
        assert!(store.public_key(current.kid()).is_some());
    }

    #[test]
    fn test_rotate_sets_current_and_retains_previous() {
        let store = KeyStore::new(Duration::ZERO).unwrap();
        let first = store.current().kid().to_string();

        let second = store.rotate().unwrap();

        assert_eq!(store.current().kid(), second);
        assert_ne!(first, second);
        assert!(store.public_key(&first).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_rotate_n_times_points_at_last_key() {
        let store = KeyStore::new(Duration::ZERO).unwrap();
        let mut last = String::new();
        for _ in 0..3 {
            last = store.rotate().unwrap();
        }

        assert_eq!(store.current().kid(), last);
        let kids: HashSet<_> = store.all_public().iter().map(|k| k.kid().to_string()).collect();
        assert_eq!(kids.len(), 4);
        assert!(kids.contains(&last));
    }

    #[test]
    fn test_prune_removes_expired_keys_only() {
        let store = KeyStore::new(Duration::from_secs(3600)).unwrap();
        let first = store.current().kid().to_string();

        // Still within max age
        let second = store.rotate_at(Utc::now() + chrono::Duration::minutes(30)).unwrap();
        assert!(store.public_key(&first).is_some());

        // First key is now 2h old, second 1.5h old
        let third = store.rotate_at(Utc::now() + chrono::Duration::hours(2)).unwrap();
        assert!(store.public_key(&first).is_none());
        assert!(store.public_key(&second).is_none());
        assert_eq!(store.current().kid(), third);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prune_never_removes_current() {
        let store = KeyStore::new(Duration::from_secs(60)).unwrap();
        let first = store.current().kid().to_string();
        let kid = store.rotate().unwrap();

        // Every key is older than a cutoff one day ahead
        let pruned = store.ring.write().prune(Utc::now() + chrono::Duration::days(1));

        assert_eq!(pruned, 1);
        assert!(store.public_key(&first).is_none());
        assert_eq!(store.current().kid(), kid);
        assert_eq!(store.all_public().len(), 1);
    }

    #[test]
    fn test_current_older_than_max_age_is_still_published() {
        let store = KeyStore::new(Duration::from_secs(3600)).unwrap();

        // Current key is two hours old by wall clock
        let kid = store.rotate_at(Utc::now() - chrono::Duration::hours(2)).unwrap();

        assert_eq!(store.current().kid(), kid);
        assert!(store.all_public().iter().any(|k| k.kid() == kid));
    }

    #[test]
    fn test_zero_max_age_never_prunes() {
        let store = KeyStore::new(Duration::ZERO).unwrap();
        let first = store.current().kid().to_string();

        store.rotate_at(Utc::now() + chrono::Duration::days(365)).unwrap();

        assert!(store.public_key(&first).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_all_public_matches_retained_keys() {
        let store = KeyStore::new(Duration::ZERO).unwrap();
        let current = store.current();

        let all = store.all_public();
        assert_eq!(all.len(), 1);
        assert_eq!(&all[0], current.public_key());
    }
}
