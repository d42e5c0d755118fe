//! Authentication provider port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::UserId;

/// Port for validating bearer credentials issued by the platform's auth
/// provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Validates a bearer token and returns the authenticated user.
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Errors from credential validation.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("credential is expired")]
    Expired,

    #[error("credential is invalid: {0}")]
    InvalidToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn AuthProvider) {}
    }
}
