//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

const MIN_JWT_SECRET_LEN: usize = 32;

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for JWT verification
    pub jwt_secret: SecretString,
}

impl AuthConfig {
    /// Validate authentication configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("auth.jwt_secret"));
        }
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ValidationError::JwtSecretTooShort);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_long_secret() {
        let config = AuthConfig {
            jwt_secret: SecretString::new("a".repeat(48)),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_secret() {
        let config = AuthConfig {
            jwt_secret: SecretString::new(String::new()),
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("auth.jwt_secret"))
        ));
    }

    #[test]
    fn rejects_short_secret() {
        let config = AuthConfig {
            jwt_secret: SecretString::new("too-short".to_string()),
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::JwtSecretTooShort)
        ));
    }
}
