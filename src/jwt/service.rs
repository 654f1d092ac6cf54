//! Token issuance and verification.

use crate::config::JwtConfig;
use crate::error::TokenError;
use crate::jwt::claims::{validate_claim_data, ClaimData, Claims};
use crate::jwt::resolver::KeyResolver;
use crate::jwt::token::Token;
use crate::keys::KeyStore;
use crate::metrics;
use jsonwebtoken::{encode, Algorithm, Header};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Clock skew tolerated on `exp` and `nbf`, in seconds.
pub const CLOCK_SKEW_LEEWAY_SECS: i64 = 30;

/// Issues tokens signed with the store's current key and verifies tokens
/// against any [`KeyResolver`].
pub struct TokenService {
    keys: Arc<KeyStore>,
    config: JwtConfig,
}

impl TokenService {
    /// Creates a service signing with `keys`.
    #[must_use]
    pub fn new(keys: Arc<KeyStore>, config: JwtConfig) -> Self {
        Self { keys, config }
    }

    /// Issue a token for `subject` carrying application `data`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::ReservedClaim`] if `data` uses a protocol claim
    /// name, [`TokenError::InvalidClaimValue`] for a non-finite number,
    /// [`TokenError::Config`] if the configured expiry overflows, or a
    /// signing error if encoding fails.
    pub fn issue(&self, subject: &str, data: ClaimData) -> Result<String, TokenError> {
        self.issue_at(subject, data, chrono::Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// See [`TokenService::issue`].
    #[instrument(skip(self, data))]
    pub fn issue_at(&self, subject: &str, data: ClaimData, now: i64) -> Result<String, TokenError> {
        validate_claim_data(&data)?;

        let key = self.keys.current();
        let ttl = i64::try_from(self.config.expiry.as_secs())
            .map_err(|_| TokenError::config("token expiry out of range"))?;
        let claims = Claims::new(
            self.config.issuer.clone(),
            subject.to_string(),
            self.config.audience.clone(),
            now,
            ttl,
            data,
        )?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.kid().to_string());

        let token = encode(&header, &claims, key.encoding_key())?;

        metrics::record_token_issued();
        debug!(kid = %key.kid(), exp = claims.exp, "Token issued");
        Ok(token)
    }

    /// Verify `token` with keys from `resolver` and return its claims.
    ///
    /// # Errors
    ///
    /// Returns the [`TokenError`] for the first failed check: envelope,
    /// algorithm, key id, key resolution, signature, then claims.
    pub async fn verify<R>(&self, token: &str, resolver: &R) -> Result<Claims, TokenError>
    where
        R: KeyResolver + ?Sized,
    {
        self.verify_at(token, resolver, chrono::Utc::now().timestamp())
            .await
    }

    /// Verify as if the current time were `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// See [`TokenService::verify`].
    pub async fn verify_at<R>(
        &self,
        token: &str,
        resolver: &R,
        now: i64,
    ) -> Result<Claims, TokenError>
    where
        R: KeyResolver + ?Sized,
    {
        let result = self.run_checks(token, resolver, now).await;

        match &result {
            Ok(claims) => {
                metrics::record_verification("ok");
                debug!(sub = %claims.sub, "Token verified");
            }
            Err(e) => {
                metrics::record_verification(e.code().as_str());
                debug!(code = e.code().as_str(), error = %e, "Token rejected");
            }
        }
        result
    }

    async fn run_checks<R>(&self, raw: &str, resolver: &R, now: i64) -> Result<Claims, TokenError>
    where
        R: KeyResolver + ?Sized,
    {
        let validated = Token::parse(raw)?
            .validate_signature(resolver)
            .await?
            .validate_claims(
                &self.config.issuer,
                &self.config.audience,
                now,
                CLOCK_SKEW_LEEWAY_SECS,
            )?;
        Ok(validated.into_claims())
    }

    /// Key store tokens are signed from.
    #[must_use]
    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    /// Issuer, audience and expiry settings.
    #[must_use]
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClaimCheck;
    use crate::jwt::claims::ClaimValue;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use std::time::Duration;

    fn service() -> TokenService {
        let store = Arc::new(KeyStore::new(Duration::ZERO).unwrap());
        TokenService::new(
            store,
            JwtConfig {
                issuer: "auth.example.com".to_string(),
                audience: "api.example.com".to_string(),
                expiry: Duration::from_secs(900),
            },
        )
    }

    fn role_admin() -> ClaimData {
        ClaimData::from([("role".to_string(), ClaimValue::from("admin"))])
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let svc = service();
        let token = svc.issue("user_123", role_admin()).unwrap();

        let claims = svc.verify(&token, svc.key_store()).await.unwrap();

        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.iss, "auth.example.com");
        assert_eq!(claims.aud, "api.example.com");
        assert_eq!(claims.get("role").and_then(ClaimValue::as_str), Some("admin"));
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_header_carries_kid() {
        let svc = service();
        let token = svc.issue("user", ClaimData::new()).unwrap();

        let header = token.split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).unwrap()).unwrap();

        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["typ"], "JWT");
        assert_eq!(header["kid"], svc.key_store().current().kid());
    }

    #[test]
    fn test_reserved_claim_rejected() {
        let svc = service();
        let data = ClaimData::from([("iss".to_string(), ClaimValue::from("x"))]);

        let result = svc.issue("user", data);
        assert!(matches!(result, Err(TokenError::ReservedClaim { key }) if key == "iss"));
    }

    #[test]
    fn test_huge_expiry_is_an_error() {
        let svc = service();
        let huge = TokenService::new(
            Arc::clone(svc.key_store()),
            JwtConfig {
                expiry: Duration::from_secs(i64::MAX as u64 - 10),
                ..svc.config().clone()
            },
        );

        let result = huge.issue("u", ClaimData::new());
        assert!(matches!(result, Err(TokenError::Config { .. })));
    }

    #[tokio::test]
    async fn test_non_finite_float_rejected_and_finite_round_trips() {
        let svc = service();
        let nan = ClaimData::from([("ratio".to_string(), ClaimValue::Float(f64::NAN))]);
        assert!(matches!(
            svc.issue("u", nan),
            Err(TokenError::InvalidClaimValue { key, .. }) if key == "ratio"
        ));

        let finite = ClaimData::from([("ratio".to_string(), ClaimValue::Float(0.75))]);
        let token = svc.issue("u", finite.clone()).unwrap();
        let claims = svc.verify(&token, svc.key_store()).await.unwrap();
        assert_eq!(claims.data, finite);
    }

    #[tokio::test]
    async fn test_expiry_boundaries() {
        let svc = service();
        let issued_at = 1_700_000_000;
        let token = svc.issue_at("user", ClaimData::new(), issued_at).unwrap();
        let exp = issued_at + 900;
        let store = svc.key_store();

        assert!(svc.verify_at(&token, store, exp - 1).await.is_ok());
        assert!(svc
            .verify_at(&token, store, exp + CLOCK_SKEW_LEEWAY_SECS)
            .await
            .is_ok());

        let result = svc
            .verify_at(&token, store, exp + CLOCK_SKEW_LEEWAY_SECS + 1)
            .await;
        assert!(matches!(
            result,
            Err(TokenError::ClaimValidation {
                check: ClaimCheck::Expired
            })
        ));
    }

    #[tokio::test]
    async fn test_not_yet_valid() {
        let svc = service();
        let issued_at = 1_700_000_000;
        let token = svc.issue_at("user", ClaimData::new(), issued_at).unwrap();
        let store = svc.key_store();

        assert!(svc.verify_at(&token, store, issued_at - 30).await.is_ok());
        let result = svc.verify_at(&token, store, issued_at - 31).await;
        assert!(matches!(
            result,
            Err(TokenError::ClaimValidation {
                check: ClaimCheck::NotYetValid
            })
        ));
    }

    #[tokio::test]
    async fn test_wrong_audience_and_issuer() {
        let svc = service();
        let token = svc.issue("user", ClaimData::new()).unwrap();

        let other_aud = TokenService::new(
            Arc::clone(svc.key_store()),
            JwtConfig {
                audience: "other".to_string(),
                ..svc.config().clone()
            },
        );
        let result = other_aud.verify(&token, svc.key_store()).await;
        assert!(matches!(
            result,
            Err(TokenError::ClaimValidation {
                check: ClaimCheck::Audience
            })
        ));

        let other_iss = TokenService::new(
            Arc::clone(svc.key_store()),
            JwtConfig {
                issuer: "other".to_string(),
                ..svc.config().clone()
            },
        );
        let result = other_iss.verify(&token, svc.key_store()).await;
        assert!(matches!(
            result,
            Err(TokenError::ClaimValidation {
                check: ClaimCheck::Issuer
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_key() {
        let svc = service();
        let other = service();
        let token = other.issue("user", ClaimData::new()).unwrap();

        let result = svc.verify(&token, svc.key_store()).await;
        assert!(matches!(result, Err(TokenError::UnknownKey { .. })));
    }

    #[tokio::test]
    async fn test_tampered_payload_fails_signature() {
        let svc = service();
        let token = svc.issue("user", role_admin()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut payload: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        payload["sub"] = serde_json::json!("root");
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap()),
            parts[2]
        );

        let result = svc.verify(&forged, svc.key_store()).await;
        assert!(matches!(result, Err(TokenError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn test_verification_is_idempotent() {
        let svc = service();
        let token = svc.issue("user", role_admin()).unwrap();
        let store = svc.key_store();

        let first = svc.verify(&token, store).await.unwrap();
        let second = svc.verify(&token, store).await.unwrap();
        assert_eq!(first, second);
    }
}
