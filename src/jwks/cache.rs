//! Read-through cache of a remote party's published key set.
//!
//! `resolve` refreshes synchronously when the cache has expired or the
//! requested key is missing. There is no background refresh. The fetch runs
//! outside the lock and only the final swap takes the write lock, so
//! concurrent misses may fetch more than once; they all converge on the
//! same mapping.

use crate::config::KeySetCacheConfig;
use crate::error::TokenError;
use crate::jwks::document::Jwks;
use crate::jwks::fetcher::{HttpKeySetFetcher, KeySetFetcher};
use crate::keys::PublicKey;
use crate::metrics;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

struct CacheState {
    keys: Arc<HashMap<String, PublicKey>>,
    refreshed_at: Option<Instant>,
}

impl CacheState {
    fn is_expired(&self, lifetime: Duration) -> bool {
        self.refreshed_at
            .map_or(true, |at| at.elapsed() >= lifetime)
    }
}

/// Cached view of a remote JWK set, keyed by key identifier.
pub struct RemoteKeySet {
    state: RwLock<CacheState>,
    url: String,
    lifetime: Duration,
    fetcher: Arc<dyn KeySetFetcher>,
}

impl RemoteKeySet {
    /// Creates an empty, already-expired cache for the set at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, lifetime: Duration, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        Self {
            state: RwLock::new(CacheState {
                keys: Arc::new(HashMap::new()),
                refreshed_at: None,
            }),
            url: url.into(),
            lifetime,
            fetcher,
        }
    }

    /// Creates a cache that fetches over HTTP with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &KeySetCacheConfig) -> Result<Self, TokenError> {
        let fetcher = HttpKeySetFetcher::new(config.fetch_timeout)?;
        Ok(Self::new(
            config.jwks_url.as_str(),
            config.lifetime,
            Arc::new(fetcher),
        ))
    }

    /// Cached key for `kid`. Never fetches.
    #[must_use]
    pub fn lookup(&self, kid: &str) -> Option<PublicKey> {
        self.state.read().keys.get(kid).cloned()
    }

    /// Fetch the remote set and replace the cached mapping wholesale.
    ///
    /// Returns the number of keys now cached. On failure the previous
    /// mapping and expiry are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::KeySetFetch`] on transport failure and
    /// [`TokenError::KeySetDecode`] if the document or any RSA entry in it
    /// cannot be decoded.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn refresh(&self) -> Result<usize, TokenError> {
        let keys = match self.fetch_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "JWKS refresh failed, keeping cached keys");
                metrics::record_jwks_refresh("failure");
                return Err(e);
            }
        };

        let count = keys.len();
        {
            let mut state = self.state.write();
            state.keys = Arc::new(keys);
            state.refreshed_at = Some(Instant::now());
        }

        metrics::record_jwks_refresh("success");
        info!(keys = count, "JWKS cache updated");
        Ok(count)
    }

    async fn fetch_keys(&self) -> Result<HashMap<String, PublicKey>, TokenError> {
        let body = self.fetcher.fetch(&self.url).await?;
        let jwks = Jwks::from_slice(&body)?;

        let mut keys = HashMap::with_capacity(jwks.keys.len());
        for jwk in &jwks.keys {
            if !jwk.is_rsa_signing_key() {
                warn!(kid = %jwk.kid, kty = %jwk.kty, "Skipping non RS256 signing key");
                continue;
            }
            keys.insert(jwk.kid.clone(), jwk.to_public_key()?);
        }
        Ok(keys)
    }

    /// Key for `kid`, refreshing first if the cache is expired or lacks it.
    ///
    /// # Errors
    ///
    /// Propagates refresh failures, and returns [`TokenError::UnknownKey`]
    /// if the key is still absent after a successful refresh.
    #[instrument(skip(self))]
    pub async fn resolve(&self, kid: &str) -> Result<PublicKey, TokenError> {
        let needs_refresh = {
            let state = self.state.read();
            state.is_expired(self.lifetime) || !state.keys.contains_key(kid)
        };

        if needs_refresh {
            self.refresh().await?;
        }

        self.lookup(kid).ok_or_else(|| TokenError::UnknownKey {
            kid: kid.to_string(),
        })
    }

    /// Whether the next `resolve` will refresh regardless of the key asked for.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.state.read().is_expired(self.lifetime)
    }

    /// Number of cached keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.state.read().keys.len()
    }

    /// Address the key set is fetched from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// How long a refresh stays valid.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}
