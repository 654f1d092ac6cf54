//! Token claims, verification states, key resolution and the token service.

pub mod claims;
pub mod resolver;
pub mod service;
pub mod token;

pub use claims::{validate_claim_data, ClaimData, ClaimValue, Claims, RESERVED_CLAIMS};
pub use resolver::KeyResolver;
pub use service::{TokenService, CLOCK_SKEW_LEEWAY_SECS};
pub use token::{SignatureValidated, Token, TokenHeader, TokenState, Unvalidated, Validated};
