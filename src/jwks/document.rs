//! Published key set wire records.

use crate::error::TokenError;
use crate::keys::PublicKey;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Key type tag for RSA keys.
pub const KEY_TYPE_RSA: &str = "RSA";
/// Usage tag for signature keys.
pub const KEY_USE_SIG: &str = "sig";
/// Algorithm tag for RSASSA-PKCS1-v1_5 with SHA-256.
pub const ALG_RS256: &str = "RS256";

/// JSON Web Key structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (RSA, EC, oct)
    pub kty: String,
    /// Key ID
    pub kid: String,
    /// Key use (sig, enc)
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Algorithm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// RSA modulus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    /// Publishable RS256 signature key record for `key`.
    #[must_use]
    pub fn from_public_key(key: &PublicKey) -> Self {
        Self {
            kty: KEY_TYPE_RSA.to_string(),
            kid: key.kid().to_string(),
            key_use: Some(KEY_USE_SIG.to_string()),
            alg: Some(ALG_RS256.to_string()),
            n: Some(URL_SAFE_NO_PAD.encode(key.modulus())),
            e: Some(URL_SAFE_NO_PAD.encode(key.exponent())),
        }
    }

    /// Whether this entry can be an RS256 verification key.
    ///
    /// Entries with no `use`/`alg` are accepted, as many issuers omit them.
    #[must_use]
    pub fn is_rsa_signing_key(&self) -> bool {
        self.kty == KEY_TYPE_RSA
            && self.key_use.as_deref().map_or(true, |u| u == KEY_USE_SIG)
            && self.alg.as_deref().map_or(true, |a| a == ALG_RS256)
    }

    /// Decode the modulus and exponent into a verification key.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::KeySetDecode`] if a component is missing, is not
    /// base64url, or does not form an acceptable RSA key.
    pub fn to_public_key(&self) -> Result<PublicKey, TokenError> {
        let n = self.component("n", self.n.as_deref())?;
        let e = self.component("e", self.e.as_deref())?;
        PublicKey::from_components(self.kid.clone(), &n, &e)
    }

    fn component(&self, name: &str, value: Option<&str>) -> Result<Vec<u8>, TokenError> {
        let value = value
            .ok_or_else(|| TokenError::decode(format!("JWK {} missing '{name}'", self.kid)))?;
        URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| TokenError::decode(format!("JWK {} has invalid '{name}': {e}", self.kid)))
    }
}

/// JSON Web Key Set structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    /// List of keys
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Empty key set.
    #[must_use]
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Append a key.
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// Find a key by identifier.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Parse a key set document.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::KeySetDecode`] if the bytes are not a key set.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TokenError> {
        serde_json::from_slice(bytes)
            .map_err(|e| TokenError::decode(format!("Failed to parse JWKS: {e}")))
    }

    /// Serialize to the JSON document form.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if serialization fails.
    pub fn to_json(&self) -> Result<String, TokenError> {
        serde_json::to_string(self).map_err(|e| TokenError::Signing {
            reason: format!("Failed to serialize JWKS: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: KEY_TYPE_RSA.to_string(),
            kid: kid.to_string(),
            key_use: Some(KEY_USE_SIG.to_string()),
            alg: Some(ALG_RS256.to_string()),
            n: Some("test-n".to_string()),
            e: Some("AQAB".to_string()),
        }
    }

    #[test]
    fn test_jwk_wire_names() {
        let json = serde_json::to_value(rsa_jwk("key-1")).unwrap();
        assert_eq!(json["kty"], "RSA");
        assert_eq!(json["use"], "sig");
        assert_eq!(json["alg"], "RS256");
        assert_eq!(json["kid"], "key-1");
        assert_eq!(json["e"], "AQAB");
    }

    #[test]
    fn test_parse_minimal_jwk() {
        let jwks = Jwks::from_slice(br#"{"keys":[{"kty":"RSA","kid":"a","n":"AQAB","e":"AQAB"}]}"#)
            .unwrap();
        let key = jwks.find_key("a").unwrap();
        assert!(key.key_use.is_none());
        assert!(key.is_rsa_signing_key());
        assert!(jwks.find_key("b").is_none());
    }

    #[test]
    fn test_signing_key_filter() {
        let mut enc = rsa_jwk("enc");
        enc.key_use = Some("enc".to_string());
        assert!(!enc.is_rsa_signing_key());

        let mut ec = rsa_jwk("ec");
        ec.kty = "EC".to_string();
        assert!(!ec.is_rsa_signing_key());

        let mut ps = rsa_jwk("ps");
        ps.alg = Some("PS256".to_string());
        assert!(!ps.is_rsa_signing_key());
    }

    #[test]
    fn test_missing_modulus_is_decode_error() {
        let mut jwk = rsa_jwk("no-n");
        jwk.n = None;
        assert!(matches!(
            jwk.to_public_key(),
            Err(TokenError::KeySetDecode { .. })
        ));
    }

    #[test]
    fn test_invalid_base64_is_decode_error() {
        let mut jwk = rsa_jwk("bad-n");
        jwk.n = Some("not base64!".to_string());
        assert!(matches!(
            jwk.to_public_key(),
            Err(TokenError::KeySetDecode { .. })
        ));
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            Jwks::from_slice(b"<html>"),
            Err(TokenError::KeySetDecode { .. })
        ));
    }

    #[test]
    fn test_jwks_default() {
        let jwks = Jwks::default();
        assert!(jwks.keys.is_empty());
        assert_eq!(jwks.to_json().unwrap(), r#"{"keys":[]}"#);
    }
}
