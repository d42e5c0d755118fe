//! Payment reference value object.
//!
//! References are assigned by the payment initiator before checkout and are
//! the idempotency key for the whole verification pipeline. They are opaque,
//! namespaced random tokens so a reference can never be guessed from another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix identifying references minted by this service.
const REFERENCE_PREFIX: &str = "ajo_";

/// Globally unique, immutable payment reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Mints a fresh reference (`ajo_` + 32 hex chars).
    pub fn generate() -> Self {
        Self(format!("{}{}", REFERENCE_PREFIX, Uuid::new_v4().simple()))
    }

    /// Wraps an externally supplied reference after format validation.
    pub fn parse(s: &str) -> Result<Self, InvalidReference> {
        let token = s
            .strip_prefix(REFERENCE_PREFIX)
            .ok_or_else(|| InvalidReference(s.to_string()))?;
        if token.len() != 32 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidReference(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PaymentReference {
    type Err = InvalidReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Error for malformed payment references.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid payment reference: {0}")]
pub struct InvalidReference(pub String);
