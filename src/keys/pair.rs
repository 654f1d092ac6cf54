//! RSA signing key pairs and their public halves.

use crate::error::TokenError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::RngCore;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use std::fmt;

/// Modulus size for generated keys, and the floor for accepted remote keys.
pub const RSA_KEY_BITS: usize = 2048;

/// Generate a random 128-bit key identifier, base64url encoded without padding.
#[must_use]
pub fn generate_key_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Public verification key with its identifier.
///
/// Keeps the raw big-endian modulus and exponent so the key can be
/// published as a JWK without re-parsing.
#[derive(Clone)]
pub struct PublicKey {
    kid: String,
    modulus: Vec<u8>,
    exponent: Vec<u8>,
    decoding_key: DecodingKey,
}

impl PublicKey {
    /// Build a public key from big-endian modulus and exponent bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::KeySetDecode`] if the components do not form a
    /// valid RSA key of at least [`RSA_KEY_BITS`] bits.
    pub fn from_components(
        kid: impl Into<String>,
        modulus: &[u8],
        exponent: &[u8],
    ) -> Result<Self, TokenError> {
        let kid = kid.into();
        let key = RsaPublicKey::new(
            BigUint::from_bytes_be(modulus),
            BigUint::from_bytes_be(exponent),
        )
        .map_err(|e| TokenError::decode(format!("invalid RSA key {kid}: {e}")))?;

        if key.n().bits() < RSA_KEY_BITS {
            return Err(TokenError::decode(format!(
                "RSA key {kid} too small: {} bits",
                key.n().bits()
            )));
        }

        Ok(Self::from_rsa(kid, &key))
    }

    fn from_rsa(kid: String, key: &RsaPublicKey) -> Self {
        let modulus = key.n().to_bytes_be();
        let exponent = key.e().to_bytes_be();
        let decoding_key = DecodingKey::from_rsa_raw_components(&modulus, &exponent);
        Self {
            kid,
            modulus,
            exponent,
            decoding_key,
        }
    }

    /// Key identifier.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Big-endian modulus bytes.
    #[must_use]
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Big-endian public exponent bytes.
    #[must_use]
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// Key in the form the signature check consumes.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("kid", &self.kid)
            .field("bits", &(self.modulus.len() * 8))
            .finish_non_exhaustive()
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.kid == other.kid && self.modulus == other.modulus && self.exponent == other.exponent
    }
}

impl Eq for PublicKey {}

/// A signing key pair owned by the key store.
pub struct KeyPair {
    kid: String,
    encoding_key: EncodingKey,
    public: PublicKey,
    created_at: DateTime<Utc>,
}

impl KeyPair {
    /// Generate a fresh 2048-bit RSA pair with a random identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::KeyGeneration`] if the RNG or PEM export fails.
    pub fn generate(created_at: DateTime<Utc>) -> Result<Self, TokenError> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), RSA_KEY_BITS)?;
        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| TokenError::KeyGeneration {
                reason: e.to_string(),
            })?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| TokenError::KeyGeneration {
                reason: e.to_string(),
            })?;

        let kid = generate_key_id();
        let public = PublicKey::from_rsa(kid.clone(), &private_key.to_public_key());

        Ok(Self {
            kid,
            encoding_key,
            public,
            created_at,
        })
    }

    /// Key identifier embedded in token headers.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Private signing half.
    #[must_use]
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Public verification half.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// When the pair was generated.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("kid", &self.kid)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
