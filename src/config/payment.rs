//! Payment provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Paystack configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Paystack secret key (sk_test_... or sk_live_...).
    /// Also used to verify webhook signatures, which Paystack signs
    /// with the same key.
    pub secret_key: SecretString,

    /// Base URL for the Paystack API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for verify calls in seconds
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_secs: u64,
}

impl PaymentConfig {
    /// Check if using a test key
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using a live key
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.expose_secret().starts_with("sk_live_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let key = self.secret_key.expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("payment.secret_key"));
        }
        if !key.starts_with("sk_") {
            return Err(ValidationError::InvalidPaystackKey);
        }
        if self.verify_timeout_secs == 0 || self.verify_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_verify_timeout() -> u64 {
    30
}
