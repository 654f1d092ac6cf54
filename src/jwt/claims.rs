//! Token claims and application claim data.

use crate::error::{ClaimCheck, TokenError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Claim names owned by the token protocol. Application data may not use them.
pub const RESERVED_CLAIMS: [&str; 10] = [
    "iss", "aud", "sub", "exp", "nbf", "iat", "jti", "kid", "alg", "typ",
];

/// Application-defined claim value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    /// JSON boolean
    Bool(bool),
    /// JSON number without a fractional part
    Integer(i64),
    /// JSON number with a fractional part; must be finite
    Float(f64),
    /// JSON string
    String(String),
    /// JSON array
    List(Vec<ClaimValue>),
    /// JSON object
    Map(HashMap<String, ClaimValue>),
}

impl ClaimValue {
    /// String content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the value survives a JSON round trip. NaN and infinities
    /// serialize as `null`, which no variant reads back.
    #[must_use]
    pub fn is_representable(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::List(items) => items.iter().all(Self::is_representable),
            Self::Map(entries) => entries.values().all(Self::is_representable),
            Self::Bool(_) | Self::Integer(_) | Self::String(_) => true,
        }
    }

    /// Boolean content, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<ClaimValue>> for ClaimValue {
    fn from(value: Vec<ClaimValue>) -> Self {
        Self::List(value)
    }
}

impl From<HashMap<String, ClaimValue>> for ClaimValue {
    fn from(value: HashMap<String, ClaimValue>) -> Self {
        Self::Map(value)
    }
}

/// Application data carried in the `data` claim.
pub type ClaimData = HashMap<String, ClaimValue>;

/// Reject application data that uses a reserved claim name or holds a
/// value that cannot be read back after encoding.
///
/// # Errors
///
/// Returns [`TokenError::ReservedClaim`] naming the first offending key, or
/// [`TokenError::InvalidClaimValue`] for a non-finite float at any depth.
pub fn validate_claim_data(data: &ClaimData) -> Result<(), TokenError> {
    if let Some(key) = data.keys().find(|key| RESERVED_CLAIMS.contains(&key.as_str())) {
        return Err(TokenError::ReservedClaim { key: key.clone() });
    }
    match data.iter().find(|(_, value)| !value.is_representable()) {
        Some((key, _)) => Err(TokenError::InvalidClaimValue {
            key: key.clone(),
            reason: "non-finite number".to_string(),
        }),
        None => Ok(()),
    }
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject the token was issued for
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Not before (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// Unique token id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Application data
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: ClaimData,
}

impl Claims {
    /// Claims issued at `now` that expire `ttl_seconds` later.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if the expiry does not fit in an `i64`.
    pub fn new(
        issuer: String,
        subject: String,
        audience: String,
        now: i64,
        ttl_seconds: i64,
        data: ClaimData,
    ) -> Result<Self, TokenError> {
        let exp = now
            .checked_add(ttl_seconds)
            .ok_or_else(|| TokenError::config("token expiry out of range"))?;
        Ok(Claims {
            sub: subject,
            iss: issuer,
            aud: audience,
            iat: now,
            exp,
            nbf: Some(now),
            jti: Some(uuid::Uuid::new_v4().to_string()),
            data,
        })
    }

    /// Check `exp` and `nbf` against `now`, tolerating `leeway_seconds` of skew.
    ///
    /// # Errors
    ///
    /// Returns the failed [`ClaimCheck`].
    pub fn check_time(&self, now: i64, leeway_seconds: i64) -> Result<(), ClaimCheck> {
        if now > self.exp.saturating_add(leeway_seconds) {
            return Err(ClaimCheck::Expired);
        }
        if let Some(nbf) = self.nbf {
            if now.saturating_add(leeway_seconds) < nbf {
                return Err(ClaimCheck::NotYetValid);
            }
        }
        Ok(())
    }

    /// Application data value for `key`.
    pub fn get(&self, key: &str) -> Option<&ClaimValue> {
        self.data.get(key)
    }
}
