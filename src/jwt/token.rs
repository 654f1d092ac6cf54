//! Type-state token verification.
//!
//! A token moves `Unvalidated → SignatureValidated → Validated`; claims are
//! only reachable once every check has passed.

use crate::error::{ClaimCheck, TokenError};
use crate::jwks::ALG_RS256;
use crate::jwt::claims::Claims;
use crate::jwt::resolver::KeyResolver;
use crate::keys::PublicKey;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::Deserialize;

mod private {
    pub trait Sealed {}
}

/// Marker trait for token validation states.
pub trait TokenState: private::Sealed {
    /// Human-readable state name for debugging
    fn state_name() -> &'static str;
}

/// Envelope parsed, algorithm and key id checked, nothing verified.
pub struct Unvalidated;
impl private::Sealed for Unvalidated {}
impl TokenState for Unvalidated {
    fn state_name() -> &'static str {
        "Unvalidated"
    }
}

/// Signature verified; claims decoded but not checked.
pub struct SignatureValidated {
    claims: Claims,
}
impl private::Sealed for SignatureValidated {}
impl TokenState for SignatureValidated {
    fn state_name() -> &'static str {
        "SignatureValidated"
    }
}

/// Signature and claims verified.
pub struct Validated {
    claims: Claims,
}
impl private::Sealed for Validated {}
impl TokenState for Validated {
    fn state_name() -> &'static str {
        "Validated"
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: Option<String>,
    kid: Option<String>,
}

/// Header fields the verifier relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared algorithm; always `RS256` after parsing
    pub alg: String,
    /// Signing key identifier
    pub kid: String,
}

/// A compact-serialized token in validation state `S`.
pub struct Token<S: TokenState> {
    raw: String,
    header: TokenHeader,
    state: S,
}

impl Token<Unvalidated> {
    /// Parse the envelope and check the header.
    ///
    /// # Errors
    ///
    /// * [`TokenError::MalformedToken`] if the token is not three base64url
    ///   segments with a JSON header
    /// * [`TokenError::UnsupportedAlgorithm`] if `alg` is not `RS256`
    /// * [`TokenError::MissingKeyId`] if there is no non-empty `kid`
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(TokenError::malformed("expected three non-empty segments"));
        }

        let header_bytes = URL_SAFE_NO_PAD
            .decode(parts[0])
            .map_err(|e| TokenError::malformed(format!("Invalid header encoding: {e}")))?;
        let header: RawHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| TokenError::malformed(format!("Invalid header: {e}")))?;

        let alg = header
            .alg
            .ok_or_else(|| TokenError::malformed("Missing alg in header"))?;
        if alg != ALG_RS256 {
            return Err(TokenError::UnsupportedAlgorithm { algorithm: alg });
        }

        let kid = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or(TokenError::MissingKeyId)?;

        Ok(Token {
            raw: raw.to_string(),
            header: TokenHeader { alg, kid },
            state: Unvalidated,
        })
    }

    /// Key identifier from the header.
    pub fn kid(&self) -> &str {
        &self.header.kid
    }

    /// Resolve the signing key by `kid` and verify the signature with it.
    ///
    /// # Errors
    ///
    /// Propagates resolver errors, and returns
    /// [`TokenError::SignatureInvalid`] if the signature does not match.
    pub async fn validate_signature<R>(
        self,
        resolver: &R,
    ) -> Result<Token<SignatureValidated>, TokenError>
    where
        R: KeyResolver + ?Sized,
    {
        let key = resolver.resolve(&self.header.kid).await?;
        self.validate_signature_with_key(&key)
    }

    /// Verify the signature against a specific key.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::SignatureInvalid`] on mismatch and
    /// [`TokenError::MalformedToken`] if the payload cannot be decoded.
    pub fn validate_signature_with_key(
        self,
        key: &PublicKey,
    ) -> Result<Token<SignatureValidated>, TokenError> {
        // Time and audience checks run in `validate_claims` with our own clock
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data =
            decode::<Claims>(&self.raw, key.decoding_key(), &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                    ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm {
                        algorithm: self.header.alg.clone(),
                    },
                    _ => TokenError::malformed(format!("Invalid payload: {e}")),
                }
            })?;

        Ok(Token {
            raw: self.raw,
            header: self.header,
            state: SignatureValidated {
                claims: token_data.claims,
            },
        })
    }
}

impl Token<SignatureValidated> {
    /// Check audience, issuer and time window.
    ///
    /// `leeway_seconds` applies to `exp` and `nbf` only.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::ClaimValidation`] naming the first failed check.
    pub fn validate_claims(
        self,
        issuer: &str,
        audience: &str,
        now: i64,
        leeway_seconds: i64,
    ) -> Result<Token<Validated>, TokenError> {
        let claims = &self.state.claims;

        let check = if claims.aud != audience {
            Err(ClaimCheck::Audience)
        } else if claims.iss != issuer {
            Err(ClaimCheck::Issuer)
        } else {
            claims.check_time(now, leeway_seconds)
        };
        check.map_err(|check| TokenError::ClaimValidation { check })?;

        Ok(Token {
            raw: self.raw,
            header: self.header,
            state: Validated {
                claims: self.state.claims,
            },
        })
    }

    /// Claims before issuer/audience/time checks.
    pub fn peek_claims(&self) -> &Claims {
        &self.state.claims
    }
}

impl Token<Validated> {
    /// Access claims - only available on fully validated tokens
    pub fn claims(&self) -> &Claims {
        &self.state.claims
    }

    /// Consume the token, keeping its claims.
    pub fn into_claims(self) -> Claims {
        self.state.claims
    }

    /// Get the raw token string
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl<S: TokenState> Token<S> {
    /// Get the current state name
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }

    /// Parsed header.
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    fn token_with_header(header: &str) -> String {
        format!("{}.{}.{}", segment(header), segment("{}"), segment("sig"))
    }

    #[test]
    fn test_parse_valid_header() {
        let token = Token::parse(&token_with_header(r#"{"alg":"RS256","kid":"k1","typ":"JWT"}"#))
            .unwrap();
        assert_eq!(token.kid(), "k1");
        assert_eq!(token.header().alg, "RS256");
        assert_eq!(token.state_name(), "Unvalidated");
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        for raw in ["", "a.b", "a.b.c.d", "a..c"] {
            assert!(
                matches!(Token::parse(raw), Err(TokenError::MalformedToken { .. })),
                "{raw:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_rejects_bad_header_encoding() {
        assert!(matches!(
            Token::parse("!!!.e30.c2ln"),
            Err(TokenError::MalformedToken { .. })
        ));
        let not_json = format!("{}.e30.c2ln", segment("not json"));
        assert!(matches!(
            Token::parse(&not_json),
            Err(TokenError::MalformedToken { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_other_algorithms() {
        for alg in ["HS256", "none", "RS384", "PS256", "ES256"] {
            let raw = token_with_header(&format!(r#"{{"alg":"{alg}","kid":"k1"}}"#));
            match Token::parse(&raw) {
                Err(TokenError::UnsupportedAlgorithm { algorithm }) => assert_eq!(algorithm, alg),
                other => panic!("expected unsupported algorithm for {alg}, got {:?}", other.err()),
            }
        }
    }

    #[test]
    fn test_parse_requires_kid() {
        let raw = token_with_header(r#"{"alg":"RS256"}"#);
        assert!(matches!(Token::parse(&raw), Err(TokenError::MissingKeyId)));

        let raw = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        assert!(matches!(Token::parse(&raw), Err(TokenError::MissingKeyId)));
    }
}
