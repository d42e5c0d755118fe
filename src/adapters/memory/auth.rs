//! Token-map auth provider for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::ports::{AuthError, AuthProvider};

enum TokenState {
    Valid(UserId),
    Expired,
}

/// Auth double mapping fixed tokens to users.
#[derive(Default)]
pub struct MockAuthProvider {
    tokens: Mutex<HashMap<String, TokenState>>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a valid bearer token for a user.
    pub fn issue_token(&self, token: &str, user_id: UserId) {
        self.lock()
            .insert(token.to_string(), TokenState::Valid(user_id));
    }

    /// Marks a token expired so `authenticate` reports `Expired`.
    pub fn expire_token(&self, token: &str) {
        self.lock().insert(token.to_string(), TokenState::Expired);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, TokenState>> {
        match self.tokens.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        match self.lock().get(token) {
            Some(TokenState::Valid(user_id)) => Ok(*user_id),
            Some(TokenState::Expired) => Err(AuthError::Expired),
            None => Err(AuthError::InvalidToken("unknown token".to_string())),
        }
    }
}
