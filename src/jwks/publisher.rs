//! Builds the key set this process publishes.

use crate::jwks::document::{Jwk, Jwks};
use crate::keys::KeyStore;

/// Build the key set document for every key the store still retains.
///
/// Keys are ordered by identifier so repeated calls produce the same
/// document while the store is unchanged.
#[must_use]
pub fn published_key_set(store: &KeyStore) -> Jwks {
    let mut keys = store.all_public();
    keys.sort_by(|a, b| a.kid().cmp(b.kid()));

    let mut jwks = Jwks::new();
    for key in &keys {
        jwks.add_key(Jwk::from_public_key(key));
    }
    jwks
}
