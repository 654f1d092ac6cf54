//! Token Authority library.
//!
//! Issues RS256 tokens from a rotating set of signing keys, publishes the
//! public keys as a JWK set, and verifies tokens against either this
//! process's keys or a cached remote key set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod metrics;
pub mod observability;

// Re-exports for convenience
pub use config::{Config, JwtConfig, KeySetCacheConfig};
pub use error::{ClaimCheck, ErrorCategory, ErrorCode, TokenError};
pub use jwks::{published_key_set, Jwk, Jwks, KeySetFetcher, RemoteKeySet};
pub use jwt::{ClaimData, ClaimValue, Claims, KeyResolver, TokenService};
pub use keys::{KeyPair, KeyStore, PublicKey};
