//! Verification key lookup by key identifier.

use crate::error::TokenError;
use crate::jwks::RemoteKeySet;
use crate::keys::{KeyStore, PublicKey};
use async_trait::async_trait;
use std::sync::Arc;

/// Finds the verification key named by a token's `kid`.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Key for `kid`, or [`TokenError::UnknownKey`] if there is none.
    async fn resolve(&self, kid: &str) -> Result<PublicKey, TokenError>;
}

/// Same-process verification against our own retained keys.
#[async_trait]
impl KeyResolver for KeyStore {
    async fn resolve(&self, kid: &str) -> Result<PublicKey, TokenError> {
        self.public_key(kid).ok_or_else(|| TokenError::UnknownKey {
            kid: kid.to_string(),
        })
    }
}

/// Verification against a peer's published keys, refreshing on miss or expiry.
#[async_trait]
impl KeyResolver for RemoteKeySet {
    async fn resolve(&self, kid: &str) -> Result<PublicKey, TokenError> {
        RemoteKeySet::resolve(self, kid).await
    }
}

#[async_trait]
impl<T: KeyResolver + ?Sized> KeyResolver for Arc<T> {
    async fn resolve(&self, kid: &str) -> Result<PublicKey, TokenError> {
        (**self).resolve(kid).await
    }
}
