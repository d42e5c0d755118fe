//! JWT bearer-token auth provider.
//!
//! Validates HS256 access tokens issued by the platform's auth service.
//! The subject claim carries the user id.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::UserId;
use crate::ports::{AuthError, AuthProvider};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    exp: i64,
}

/// HS256 token validator.
pub struct JwtAuthProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthProvider {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;
        Ok(UserId::from_uuid(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_jwt_secret_at_least_32_chars_long";

    fn token_for(user_id: UserId, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub: *user_id.as_uuid(),
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn provider() -> JwtAuthProvider {
        JwtAuthProvider::new(&SecretString::new(SECRET.to_string()))
    }

    #[tokio::test]
    async fn valid_token_yields_the_subject() {
        let user_id = UserId::new();
        let token = token_for(user_id, 3600);

        let authenticated = provider().authenticate(&token).await.unwrap();
        assert_eq!(authenticated, user_id);
    }

    #[tokio::test]
    async fn expired_token_reports_expired() {
        let token = token_for(UserId::new(), -3600);

        let result = provider().authenticate(&token).await;
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let claims = Claims {
            sub: *UserId::new().as_uuid(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"some_other_secret_entirely_here"),
        )
        .unwrap();

        let result = provider().authenticate(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let result = provider().authenticate("not.a.jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }
}
