//! Paystack payment gateway adapter.
//!
//! Implements the `PaymentGateway` trait against the Paystack REST API
//! (verify-by-reference). The secret key is held in `secrecy::SecretString`
//! and sent as a bearer token; it is never logged.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::PaymentReference;
use crate::ports::{GatewayError, GatewayStatus, GatewayTransaction, PaymentGateway};

/// Default request timeout for verify calls.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Paystack API configuration.
#[derive(Clone)]
pub struct PaystackConfig {
    /// Paystack secret key (sk_live_... or sk_test_...).
    secret_key: SecretString,

    /// Base URL for the Paystack API (default: https://api.paystack.co).
    api_base_url: String,

    verify_timeout: Duration,
}

impl PaystackConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            api_base_url: "https://api.paystack.co".to_string(),
            verify_timeout: VERIFY_TIMEOUT,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }
}

/// Paystack gateway adapter.
pub struct PaystackGateway {
    config: PaystackConfig,
    http_client: reqwest::Client,
}

impl PaystackGateway {
    pub fn new(config: PaystackConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.verify_timeout)
            .build()
            .map_err(|e| GatewayError::Protocol(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

/// Paystack response envelope: `status` is whether the API call itself
/// succeeded, distinct from the transaction's status inside `data`.
#[derive(Debug, Deserialize)]
struct VerifyEnvelope {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    paid_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    fees: Option<i64>,
    #[serde(default)]
    authorization: Option<VerifyAuthorization>,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct VerifyAuthorization {
    #[serde(default)]
    authorization_code: Option<String>,
}

impl VerifyData {
    fn into_transaction(self) -> GatewayTransaction {
        GatewayTransaction {
            status: GatewayStatus::parse(&self.status),
            amount: self.amount,
            currency: self.currency,
            paid_at: self.paid_at.map(Timestamp::from_datetime),
            channel: self.channel,
            fees: self.fees,
            authorization_code: self.authorization.and_then(|a| a.authorization_code),
            metadata: self.metadata,
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn verify_transaction(
        &self,
        reference: &PaymentReference,
    ) -> Result<GatewayTransaction, GatewayError> {
        let url = format!(
            "{}/transaction/verify/{}",
            self.config.api_base_url,
            reference.as_str()
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                // Timeouts and connection failures are transient.
                tracing::warn!(reference = %reference, error = %e, "Paystack verify call failed");
                GatewayError::Unreachable(e.to_string())
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Unreachable(format!(
                "Paystack returned {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                reference = %reference,
                status = %status,
                body = %body,
                "Paystack rejected verify request"
            );
            return Err(GatewayError::Protocol(format!(
                "Paystack returned {status}: {body}"
            )));
        }

        let envelope: VerifyEnvelope = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(format!("malformed Paystack response: {e}")))?;

        if !envelope.status {
            return Err(GatewayError::Protocol(envelope.message));
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::Protocol("Paystack response missing data".to_string()))?;

        Ok(data.into_transaction())
    }
}
