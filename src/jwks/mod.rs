//! JWK set publishing, fetching and caching.

pub mod cache;
pub mod document;
pub mod fetcher;
pub mod publisher;

pub use cache::RemoteKeySet;
pub use document::{Jwk, Jwks, ALG_RS256, KEY_TYPE_RSA, KEY_USE_SIG};
pub use fetcher::{HttpKeySetFetcher, KeySetFetcher};
pub use publisher::published_key_set;
