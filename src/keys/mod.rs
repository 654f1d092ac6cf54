//! Signing key pairs and the key store that rotates them.

pub mod pair;
pub mod store;

pub use pair::{generate_key_id, KeyPair, PublicKey, RSA_KEY_BITS};
pub use store::KeyStore;
