//! Error types for token issuance, verification and key management.
//!
//! Every failure mode has its own variant so a transport layer can map
//! each one to a response without inspecting internal state. Variants are
//! grouped into [`ErrorCategory`] for logging and alerting.

use std::fmt;
use thiserror::Error;

/// Claim check that failed during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimCheck {
    /// `iss` did not match the configured issuer
    Issuer,
    /// `aud` did not match the configured audience
    Audience,
    /// `exp` is in the past (beyond leeway)
    Expired,
    /// `nbf` is in the future (beyond leeway)
    NotYetValid,
}

impl ClaimCheck {
    /// Claim name the check applies to.
    #[must_use]
    pub const fn claim(&self) -> &'static str {
        match self {
            Self::Issuer => "iss",
            Self::Audience => "aud",
            Self::Expired => "exp",
            Self::NotYetValid => "nbf",
        }
    }
}

impl fmt::Display for ClaimCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issuer => write!(f, "issuer mismatch"),
            Self::Audience => write!(f, "audience mismatch"),
            Self::Expired => write!(f, "token expired"),
            Self::NotYetValid => write!(f, "token not yet valid"),
        }
    }
}

/// Errors produced by the key store, key-set cache and token pipeline.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TokenError {
    /// Application data used a claim name owned by the protocol
    #[error("Reserved claim key used: {key}")]
    ReservedClaim {
        /// Offending key
        key: String,
    },

    /// Application data held a value that cannot be encoded faithfully
    #[error("Invalid claim value for {key}: {reason}")]
    InvalidClaimValue {
        /// Offending top-level key
        key: String,
        /// What is wrong with the value
        reason: String,
    },

    /// Token envelope could not be parsed
    #[error("Token malformed: {reason}")]
    MalformedToken {
        /// Description of the malformation
        reason: String,
    },

    /// Header declared an algorithm other than RS256
    #[error("Unsupported token algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// Declared algorithm
        algorithm: String,
    },

    /// Header carried no key identifier
    #[error("Missing kid in token header")]
    MissingKeyId,

    /// No verification key exists for the key identifier
    #[error("Unknown signing key: {kid}")]
    UnknownKey {
        /// Key identifier from the token header
        kid: String,
    },

    /// Signature did not verify against the resolved key
    #[error("Token signature invalid")]
    SignatureInvalid,

    /// Issuer, audience or time window check failed
    #[error("Claim validation failed: {check}")]
    ClaimValidation {
        /// The failed check
        check: ClaimCheck,
    },

    /// Fetching the remote key set failed
    #[error("Key set fetch failed: {reason}")]
    KeySetFetch {
        /// Transport-level reason
        reason: String,
    },

    /// Remote key set could not be decoded
    #[error("Key set decode failed: {reason}")]
    KeySetDecode {
        /// Decode-level reason
        reason: String,
    },

    /// Generating a signing key pair failed
    #[error("Key generation failed: {reason}")]
    KeyGeneration {
        /// Underlying reason
        reason: String,
    },

    /// Encoding or signing the token failed
    #[error("Token signing failed: {reason}")]
    Signing {
        /// Underlying reason
        reason: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of the problem
        reason: String,
    },
}

/// Broad class of a [`TokenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller supplied bad input
    Input,
    /// Verification key could not be resolved
    KeyResolution,
    /// Security-relevant cryptographic rejection
    Cryptographic,
    /// Token was authentic but its claims were not acceptable
    ClaimValidation,
    /// Local failure unrelated to the token itself
    Internal,
}

/// Error codes for transport responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Reserved claim name in application data
    ReservedClaim,
    /// Application data value cannot be encoded
    InvalidClaimValue,
    /// Token is not a well-formed compact JWT
    TokenMalformed,
    /// Algorithm other than RS256
    UnsupportedAlgorithm,
    /// No `kid` in the header
    MissingKeyId,
    /// `kid` not known to the resolver
    UnknownKey,
    /// Signature mismatch
    SignatureInvalid,
    /// Issuer, audience or time window rejected
    ClaimsInvalid,
    /// Remote key set unreachable
    KeySetFetch,
    /// Remote key set unreadable
    KeySetDecode,
    /// Local failure
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReservedClaim => "TOKEN_RESERVED_CLAIM",
            Self::InvalidClaimValue => "TOKEN_INVALID_CLAIM_VALUE",
            Self::TokenMalformed => "TOKEN_MALFORMED",
            Self::UnsupportedAlgorithm => "TOKEN_UNSUPPORTED_ALGORITHM",
            Self::MissingKeyId => "TOKEN_MISSING_KID",
            Self::UnknownKey => "TOKEN_UNKNOWN_KEY",
            Self::SignatureInvalid => "TOKEN_SIGNATURE_INVALID",
            Self::ClaimsInvalid => "TOKEN_CLAIMS_INVALID",
            Self::KeySetFetch => "JWKS_FETCH_FAILED",
            Self::KeySetDecode => "JWKS_DECODE_FAILED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl TokenError {
    /// Create a malformed token error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    /// Create a key set fetch error.
    #[must_use]
    pub fn fetch(reason: impl Into<String>) -> Self {
        Self::KeySetFetch {
            reason: reason.into(),
        }
    }

    /// Create a key set decode error.
    #[must_use]
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::KeySetDecode {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ReservedClaim { .. } => ErrorCode::ReservedClaim,
            Self::InvalidClaimValue { .. } => ErrorCode::InvalidClaimValue,
            Self::MalformedToken { .. } => ErrorCode::TokenMalformed,
            Self::UnsupportedAlgorithm { .. } => ErrorCode::UnsupportedAlgorithm,
            Self::MissingKeyId => ErrorCode::MissingKeyId,
            Self::UnknownKey { .. } => ErrorCode::UnknownKey,
            Self::SignatureInvalid => ErrorCode::SignatureInvalid,
            Self::ClaimValidation { .. } => ErrorCode::ClaimsInvalid,
            Self::KeySetFetch { .. } => ErrorCode::KeySetFetch,
            Self::KeySetDecode { .. } => ErrorCode::KeySetDecode,
            Self::KeyGeneration { .. } | Self::Signing { .. } | Self::Config { .. } => {
                ErrorCode::Internal
            }
        }
    }

    /// Get the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ReservedClaim { .. }
            | Self::InvalidClaimValue { .. }
            | Self::MalformedToken { .. } => ErrorCategory::Input,
            Self::MissingKeyId
            | Self::UnknownKey { .. }
            | Self::KeySetFetch { .. }
            | Self::KeySetDecode { .. } => ErrorCategory::KeyResolution,
            Self::SignatureInvalid | Self::UnsupportedAlgorithm { .. } => {
                ErrorCategory::Cryptographic
            }
            Self::ClaimValidation { .. } => ErrorCategory::ClaimValidation,
            Self::KeyGeneration { .. } | Self::Signing { .. } | Self::Config { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    /// Check if the failure may clear up if the caller tries again later.
    ///
    /// Nothing in this crate retries on its own.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::KeySetFetch { .. })
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Signing {
            reason: err.to_string(),
        }
    }
}

impl From<rsa::Error> for TokenError {
    fn from(err: rsa::Error) -> Self {
        Self::KeyGeneration {
            reason: err.to_string(),
        }
    }
}
